//! Cache-aside resolution of a role's permission codes
//!
//! The cache is consulted first; on a miss, a backend failure or a timeout
//! the store is read and the cache repopulated. Cache failures never fail a
//! resolution. Concurrent misses for the same role each read the store and
//! write the cache; both operations are idempotent.
//!
//! A resolution that reads the store just before a change to the role's
//! links commits may write the old set back after that change invalidated
//! the entry. The stale set is then served for at most one TTL.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::{PermissionCache, role_permissions_key};
use crate::config::AuthzConfig;
use crate::error::AuthzResult;
use crate::models::canonical_role_code;
use crate::store::RoleStore;

pub struct PermissionResolver {
    store: Arc<dyn RoleStore>,
    cache: Arc<dyn PermissionCache>,
    ttl: Duration,
    cache_timeout: Duration,
}

impl PermissionResolver {
    pub fn new(
        store: Arc<dyn RoleStore>,
        cache: Arc<dyn PermissionCache>,
        config: &AuthzConfig,
    ) -> Self {
        Self {
            store,
            cache,
            ttl: config.cache_ttl(),
            cache_timeout: config.cache_timeout(),
        }
    }

    /// Permission codes held by the role; empty for an unknown role.
    /// Only a store failure is reported as an error.
    pub async fn get_permissions_for_role(&self, role_code: &str) -> AuthzResult<Vec<String>> {
        let role_code = canonical_role_code(role_code);
        let key = role_permissions_key(&role_code);

        match timeout(self.cache_timeout, self.cache.get(&key)).await {
            Ok(Ok(Some(codes))) => return Ok(codes),
            Ok(Ok(None)) => debug!("Permission cache miss for {}", role_code),
            Ok(Err(e)) => warn!("{}; reading {} from store", e, role_code),
            Err(_) => warn!(
                "Permission cache read timed out after {:?}; reading {} from store",
                self.cache_timeout, role_code
            ),
        }

        let codes = self.store.resolve_role_permission_codes(&role_code).await?;

        match timeout(
            self.cache_timeout,
            self.cache.set_with_ttl(&key, &codes, self.ttl),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Could not cache permissions of {}: {}", role_code, e),
            Err(_) => warn!(
                "Caching permissions of {} timed out after {:?}",
                role_code, self.cache_timeout
            ),
        }

        Ok(codes)
    }

    /// Drop the cached permission set of a role. Best effort: a failure is
    /// logged and the entry expires with its TTL.
    pub async fn invalidate(&self, role_code: &str) {
        let key = role_permissions_key(role_code);
        match timeout(self.cache_timeout, self.cache.delete(&key)).await {
            Ok(Ok(())) => debug!("Invalidated {}", key),
            Ok(Err(e)) => warn!(
                "Could not invalidate {}, stale for at most {:?}: {}",
                key, self.ttl, e
            ),
            Err(_) => warn!(
                "Invalidating {} timed out, stale for at most {:?}",
                key, self.ttl
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheUnavailable, MemoryPermissionCache};
    use crate::models::NewRole;
    use crate::store::MemoryRoleStore;
    use async_trait::async_trait;

    /// Cache that never answers
    struct StalledCache;

    #[async_trait]
    impl PermissionCache for StalledCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<String>>, CacheUnavailable> {
            std::future::pending().await
        }

        async fn set_with_ttl(
            &self,
            _key: &str,
            _codes: &[String],
            _ttl: Duration,
        ) -> Result<(), CacheUnavailable> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheUnavailable> {
            std::future::pending().await
        }
    }

    async fn store_with_auditor() -> Arc<MemoryRoleStore> {
        let store = Arc::new(MemoryRoleStore::new());
        let permission = store
            .upsert_permission(&crate::catalog::PERMISSIONS[1])
            .await
            .unwrap();
        let role = store
            .create_role(&NewRole {
                code: "AUDITOR".to_string(),
                name: "Auditor".to_string(),
                description: None,
            })
            .await
            .unwrap();
        store
            .replace_role_permissions(role.id, &[permission.id])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_miss_populates_cache_and_hit_skips_store() {
        let store = store_with_auditor().await;
        let cache = Arc::new(MemoryPermissionCache::new());
        let resolver = PermissionResolver::new(store.clone(), cache.clone(), &AuthzConfig::default());

        let first = resolver.get_permissions_for_role("auditor").await.unwrap();
        assert_eq!(first, vec!["users:read".to_string()]);
        assert!(cache.contains("role-permissions:AUDITOR").await);

        let second = resolver.get_permissions_for_role("AUDITOR").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(store.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_cache_falls_back_to_store() {
        let store = store_with_auditor().await;
        let cache = Arc::new(MemoryPermissionCache::new());
        cache.set_available(false);
        let resolver = PermissionResolver::new(store.clone(), cache, &AuthzConfig::default());

        for _ in 0..2 {
            let codes = resolver.get_permissions_for_role("AUDITOR").await.unwrap();
            assert_eq!(codes, vec!["users:read".to_string()]);
        }
        assert_eq!(store.resolve_calls(), 2);
    }

    #[tokio::test]
    async fn test_stalled_cache_does_not_block_resolution() {
        let store = store_with_auditor().await;
        let config = AuthzConfig {
            cache_timeout_ms: 20,
            ..AuthzConfig::default()
        };
        let resolver = PermissionResolver::new(store, Arc::new(StalledCache), &config);

        let codes = tokio::time::timeout(
            Duration::from_secs(2),
            resolver.get_permissions_for_role("AUDITOR"),
        )
        .await
        .expect("resolution must not wait on a stalled cache")
        .unwrap();
        assert_eq!(codes, vec!["users:read".to_string()]);

        tokio::time::timeout(Duration::from_secs(2), resolver.invalidate("AUDITOR"))
            .await
            .expect("invalidation must not wait on a stalled cache");
    }

    #[tokio::test]
    async fn test_unknown_role_resolves_to_nothing() {
        let store = Arc::new(MemoryRoleStore::new());
        let resolver = PermissionResolver::new(
            store,
            Arc::new(MemoryPermissionCache::new()),
            &AuthzConfig::default(),
        );
        assert!(resolver.get_permissions_for_role("GHOST").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let store = store_with_auditor().await;
        let cache = Arc::new(MemoryPermissionCache::new());
        let resolver = PermissionResolver::new(store, cache.clone(), &AuthzConfig::default());

        resolver.get_permissions_for_role("AUDITOR").await.unwrap();
        resolver.invalidate("auditor").await;
        assert!(!cache.contains("role-permissions:AUDITOR").await);
    }
}
