//! Authorization core settings

use ::config::{Config, Environment};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{AuthzError, AuthzResult};

/// Settings of the resolution core
///
/// # Environment Variables
/// - `AUTHZ_CACHE_TTL_SECONDS`: lifetime of a cached permission set (default: 300)
/// - `AUTHZ_CACHE_TIMEOUT_MS`: longest wait on any cache call (default: 250)
/// - `AUTHZ_SEED_ON_EMPTY`: seed the catalog at startup when no role exists (default: true)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthzConfig {
    pub cache_ttl_seconds: u64,
    pub cache_timeout_ms: u64,
    pub seed_on_empty: bool,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 300,
            cache_timeout_ms: 250,
            seed_on_empty: true,
        }
    }
}

impl AuthzConfig {
    /// Load settings from `AUTHZ_*` environment variables over the defaults
    pub fn from_env() -> AuthzResult<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("cache_ttl_seconds", defaults.cache_ttl_seconds as i64)
            .and_then(|b| b.set_default("cache_timeout_ms", defaults.cache_timeout_ms as i64))
            .and_then(|b| b.set_default("seed_on_empty", defaults.seed_on_empty))
            .map_err(|e| AuthzError::Configuration(e.to_string()))?
            .add_source(Environment::with_prefix("AUTHZ").try_parsing(true))
            .build()
            .map_err(|e| AuthzError::Configuration(e.to_string()))?;

        let config: AuthzConfig = settings
            .try_deserialize()
            .map_err(|e| AuthzError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AuthzResult<()> {
        if self.cache_ttl_seconds == 0 {
            return Err(AuthzError::Configuration(
                "AUTHZ_CACHE_TTL_SECONDS must be greater than zero".to_string(),
            ));
        }
        if self.cache_timeout_ms == 0 {
            return Err(AuthzError::Configuration(
                "AUTHZ_CACHE_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}
