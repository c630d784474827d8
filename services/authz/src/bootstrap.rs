//! Startup seeding

use tracing::info;

use crate::config::AuthzConfig;
use crate::error::AuthzResult;
use crate::models::SeedReport;
use crate::service::AuthzService;

/// Seed the catalog once if the store holds no role at all.
///
/// Must complete before any authorization decision is served. An error here
/// is fatal to startup.
pub async fn bootstrap(
    service: &AuthzService,
    config: &AuthzConfig,
) -> AuthzResult<Option<SeedReport>> {
    if !config.seed_on_empty {
        info!("Startup seeding disabled");
        return Ok(None);
    }

    let roles = service.store().count_roles().await?;
    if roles > 0 {
        info!("Found {} roles, catalog already seeded", roles);
        return Ok(None);
    }

    info!("No roles found, seeding catalog");
    service.seed().await.map(Some)
}
