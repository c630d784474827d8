//! Error types for the authorization core

use common::error::DatabaseError;
use thiserror::Error;

/// Errors surfaced by store, seeder and service operations.
///
/// Cache failures are deliberately absent: they are handled inside the
/// resolver and never reach a caller.
#[derive(Error, Debug)]
pub enum AuthzError {
    /// Unknown role or permission
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate role code
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Client-caused failure, never partially applied
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Persistent store failure
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// One or more roles could not be seeded
    #[error("Seeding failed for roles: {}", failed_roles.join(", "))]
    Seed { failed_roles: Vec<String> },

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for AuthzError {
    fn from(e: sqlx::Error) -> Self {
        AuthzError::Database(DatabaseError::Query(e))
    }
}

/// Type alias for authorization results
pub type AuthzResult<T> = Result<T, AuthzError>;
