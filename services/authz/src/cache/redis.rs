//! Redis-backed permission cache
//!
//! Codes are stored as a JSON array under `role-permissions:<ROLE_CODE>`.

use async_trait::async_trait;
use common::cache::RedisPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::{CacheUnavailable, PermissionCache};

/// Permission cache over a shared [`RedisPool`]
#[derive(Clone)]
pub struct RedisPermissionCache {
    pool: Arc<RedisPool>,
}

impl RedisPermissionCache {
    pub fn new(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheUnavailable> {
        let raw = self
            .pool
            .get(key)
            .await
            .map_err(|e| CacheUnavailable::new(e.to_string()))?;

        // An unreadable value is reported as a miss so it gets overwritten.
        match raw {
            Some(value) => match serde_json::from_str(&value) {
                Ok(codes) => Ok(Some(codes)),
                Err(e) => {
                    warn!("Discarding unreadable cache entry {}: {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        codes: &[String],
        ttl: Duration,
    ) -> Result<(), CacheUnavailable> {
        let value =
            serde_json::to_string(codes).map_err(|e| CacheUnavailable::new(e.to_string()))?;
        self.pool
            .set(key, &value, Some(ttl.as_secs().max(1)))
            .await
            .map_err(|e| CacheUnavailable::new(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheUnavailable> {
        self.pool
            .delete(key)
            .await
            .map_err(|e| CacheUnavailable::new(e.to_string()))
    }
}
