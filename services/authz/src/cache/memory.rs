//! In-process permission cache with TTL expiry

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{CacheUnavailable, PermissionCache};

struct Entry {
    codes: Vec<String>,
    expires_at: Instant,
}

/// Permission cache kept in memory. It can be switched off to simulate a
/// dead backend.
pub struct MemoryPermissionCache {
    entries: RwLock<HashMap<String, Entry>>,
    available: AtomicBool,
}

impl Default for MemoryPermissionCache {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryPermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// When false, every operation fails with `CacheUnavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether an unexpired entry exists for `key`
    pub async fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }

    fn check(&self) -> Result<(), CacheUnavailable> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheUnavailable::new("memory cache switched off"))
        }
    }
}

#[async_trait]
impl PermissionCache for MemoryPermissionCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheUnavailable> {
        self.check()?;
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.codes.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        codes: &[String],
        ttl: Duration,
    ) -> Result<(), CacheUnavailable> {
        self.check()?;
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                codes: codes.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheUnavailable> {
        self.check()?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
