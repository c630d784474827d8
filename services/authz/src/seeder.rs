//! Catalog seeding
//!
//! Materializes the permission catalog and the built-in roles into the store.
//! Safe to run any number of times: permissions and roles are created only
//! when absent, and each system role's links are replaced wholesale with
//! its catalog grants. Running it therefore also resets any customization
//! of a system role's permissions back to the catalog definition.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{self, RoleDef};
use crate::error::{AuthzError, AuthzResult};
use crate::models::SeedReport;
use crate::resolver::PermissionResolver;
use crate::store::RoleStore;

#[derive(Clone)]
pub struct Seeder {
    store: Arc<dyn RoleStore>,
    resolver: Arc<PermissionResolver>,
}

impl Seeder {
    pub fn new(store: Arc<dyn RoleStore>, resolver: Arc<PermissionResolver>) -> Self {
        Self { store, resolver }
    }

    /// Seed the catalog. Roles are processed independently; if any of them
    /// fails the others are still seeded and the failures are reported.
    pub async fn seed(&self) -> AuthzResult<SeedReport> {
        info!(
            "Seeding {} permissions and {} roles",
            catalog::PERMISSIONS.len(),
            catalog::ROLES.len()
        );

        let mut ids: HashMap<String, Uuid> = HashMap::with_capacity(catalog::PERMISSIONS.len());
        for def in catalog::PERMISSIONS {
            let permission = self.store.upsert_permission(def).await?;
            ids.insert(permission.code, permission.id);
        }

        let mut seeded = 0;
        let mut failed_roles = Vec::new();
        for def in catalog::ROLES {
            match self.seed_role(def, &ids).await {
                Ok(()) => seeded += 1,
                Err(e) => {
                    error!("Failed to seed role {}: {}", def.code, e);
                    failed_roles.push(def.code.to_string());
                }
            }
        }

        if !failed_roles.is_empty() {
            return Err(AuthzError::Seed { failed_roles });
        }

        info!("Seeded {} permissions and {} roles", ids.len(), seeded);
        Ok(SeedReport {
            permissions: ids.len(),
            roles: seeded,
        })
    }

    async fn seed_role(&self, def: &RoleDef, ids: &HashMap<String, Uuid>) -> AuthzResult<()> {
        let role = self.store.upsert_role(def).await?;

        let permission_ids: Vec<Uuid> = def
            .permission_codes()
            .iter()
            .filter_map(|code| {
                let id = ids.get(code).copied();
                if id.is_none() {
                    warn!("Role {} grants unknown permission {}, skipping", def.code, code);
                }
                id
            })
            .collect();

        self.store
            .replace_role_permissions(role.id, &permission_ids)
            .await?;
        self.resolver.invalidate(&role.code).await;

        debug!("Seeded role {} with {} permissions", role.code, permission_ids.len());
        Ok(())
    }
}
