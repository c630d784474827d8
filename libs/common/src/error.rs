//! Custom error types for the common library
//!
//! This module defines the infrastructure error types reported by the
//! database and cache modules.

use redis::RedisError;
use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Error type for Redis operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// The client could not be created or could not connect
    #[error("Redis connection error: {0}")]
    Connection(#[source] RedisError),

    /// A command was sent but failed
    #[error("Redis command error: {0}")]
    Command(#[source] RedisError),

    /// The server did not answer in time
    #[error("Redis did not respond within {0:?}")]
    Timeout(Duration),
}

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
