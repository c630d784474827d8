//! Redis cache module
//!
//! This module provides a Redis client that is constructed once at process
//! start, shared by reference, and closed at shutdown. It performs the basic
//! cache operations (get, set with TTL, delete) with a bounded wait on every
//! round trip so a slow or dead server surfaces as an error instead of a hang.

use crate::error::{CacheError, CacheResult};
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use std::{
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::{debug, info};

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Upper bound for connecting and for each command round trip
    pub connection_timeout: Duration,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    /// - `REDIS_CONNECTION_TIMEOUT_MS`: Connect/command timeout in milliseconds (default: 250)
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let timeout_ms = std::env::var("REDIS_CONNECTION_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(250);

        Ok(RedisConfig {
            url,
            connection_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Redis client holding one lazily established multiplexed connection
pub struct RedisPool {
    client: Client,
    timeout: Duration,
    /// Never held across an await point
    connection: Mutex<Option<MultiplexedConnection>>,
    /// Serializes connection attempts
    connecting: tokio::sync::Mutex<()>,
}

/// Clears the shared connection when dropped while armed. A command future
/// that fails, times out or is cancelled by its caller leaves it armed.
struct ResetOnFailure<'a> {
    slot: &'a Mutex<Option<MultiplexedConnection>>,
    armed: bool,
}

impl Drop for ResetOnFailure<'_> {
    fn drop(&mut self) {
        if self.armed
            && self
                .slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .is_some()
        {
            debug!("Dropped Redis connection after an unfinished command");
        }
    }
}

impl RedisPool {
    /// Create the client. No connection is opened until the first command,
    /// so an unreachable server does not prevent startup.
    pub fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool {
            client,
            timeout: config.connection_timeout,
            connection: Mutex::new(None),
            connecting: tokio::sync::Mutex::new(()),
        })
    }

    fn slot(&self) -> MutexGuard<'_, Option<MultiplexedConnection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the shared connection, connecting if there is none
    async fn get_connection(&self) -> CacheResult<MultiplexedConnection> {
        let current = self.slot().clone();
        if let Some(conn) = current {
            return Ok(conn);
        }

        let _connecting = self.connecting.lock().await;
        let current = self.slot().clone();
        if let Some(conn) = current {
            return Ok(conn);
        }

        let conn = tokio::time::timeout(
            self.timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::Timeout(self.timeout))?
        .map_err(CacheError::Connection)?;

        debug!("Redis connection established");
        *self.slot() = Some(conn.clone());
        Ok(conn)
    }

    /// Run one command against the shared connection. A failure, a timeout
    /// or the caller dropping this future drops the connection so the next
    /// command reconnects.
    async fn run<T, F, Fut>(&self, op: F) -> CacheResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.get_connection().await?;
        let mut reset = ResetOnFailure {
            slot: &self.connection,
            armed: true,
        };

        let value = tokio::time::timeout(self.timeout, op(conn))
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
            .map_err(CacheError::Command)?;

        reset.armed = false;
        Ok(value)
    }

    /// Set a key-value pair in Redis with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> CacheResult<()> {
        self.run(|mut conn| async move {
            let result: redis::RedisResult<()> = match ttl_seconds {
                Some(ttl) => conn.set_ex(key, value, ttl).await,
                None => conn.set(key, value).await,
            };
            result
        })
        .await
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.run(|mut conn| async move {
            let value: redis::RedisResult<Option<String>> = conn.get(key).await;
            value
        })
        .await
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        self.run(|mut conn| async move {
            let removed: redis::RedisResult<u64> = conn.del(key).await;
            removed.map(|_| ())
        })
        .await
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let pong: String = self
            .run(|mut conn| async move { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        Ok(pong == "PONG")
    }

    /// Drop the shared connection. Later commands reconnect on demand.
    pub async fn close(&self) {
        if self.slot().take().is_some() {
            info!("Redis connection closed");
        }
    }
}
