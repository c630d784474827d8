//! Permission cache
//!
//! A TTL key/value store used cache-aside by the resolver. Every backend
//! failure is reported as [`CacheUnavailable`] so callers can choose to fall
//! back to the store instead of failing.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::canonical_role_code;

pub mod memory;
pub mod redis;

pub use memory::MemoryPermissionCache;
pub use self::redis::RedisPermissionCache;

/// Namespace of every role permission entry
pub const KEY_PREFIX: &str = "role-permissions:";

/// Cache key for a role's permission codes
pub fn role_permissions_key(role_code: &str) -> String {
    format!("{}{}", KEY_PREFIX, canonical_role_code(role_code))
}

/// The cache backend could not serve the request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("permission cache unavailable: {reason}")]
pub struct CacheUnavailable {
    pub reason: String,
}

impl CacheUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// `Ok(None)` is a miss
    async fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheUnavailable>;

    async fn set_with_ttl(
        &self,
        key: &str,
        codes: &[String],
        ttl: Duration,
    ) -> Result<(), CacheUnavailable>;

    async fn delete(&self, key: &str) -> Result<(), CacheUnavailable>;
}
