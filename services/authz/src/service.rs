//! Authorization service
//!
//! Wires the store, cache, seeder, resolver and guard together and exposes
//! the operations consumed by the surrounding application. Every successful
//! change to a role's links, or to the role's existence, is followed by a
//! best-effort invalidation of that role's cache entry.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::cache::PermissionCache;
use crate::catalog;
use crate::config::AuthzConfig;
use crate::error::{AuthzError, AuthzResult};
use crate::guard::AuthorizationGuard;
use crate::models::{
    Actor, NewRole, OperationRequirement, Permission, PermissionFilter, Role,
    RoleWithPermissions, SeedReport, UpdateRole,
};
use crate::resolver::PermissionResolver;
use crate::seeder::Seeder;
use crate::store::RoleStore;
use crate::validation::{validate_role_code, validate_role_name};

#[derive(Clone)]
pub struct AuthzService {
    store: Arc<dyn RoleStore>,
    resolver: Arc<PermissionResolver>,
    seeder: Seeder,
    guard: AuthorizationGuard,
}

impl AuthzService {
    pub fn new(
        store: Arc<dyn RoleStore>,
        cache: Arc<dyn PermissionCache>,
        config: &AuthzConfig,
    ) -> Self {
        let resolver = Arc::new(PermissionResolver::new(store.clone(), cache, config));
        Self {
            seeder: Seeder::new(store.clone(), resolver.clone()),
            guard: AuthorizationGuard::new(resolver.clone()),
            store,
            resolver,
        }
    }

    pub fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    /// Idempotent (re-)seed of the catalog
    pub async fn seed(&self) -> AuthzResult<SeedReport> {
        self.seeder.seed().await
    }

    pub async fn list_roles(&self) -> AuthzResult<Vec<RoleWithPermissions>> {
        self.store.find_all_roles().await
    }

    pub async fn get_role(&self, id: Uuid) -> AuthzResult<RoleWithPermissions> {
        self.store
            .find_role(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", id)))
    }

    pub async fn create_role(
        &self,
        code: &str,
        name: &str,
        description: Option<String>,
    ) -> AuthzResult<Role> {
        let code = validate_role_code(code)?;
        if catalog::role(&code).is_some() {
            return Err(AuthzError::InvalidRequest(format!(
                "Role code '{}' is reserved for a built-in role",
                code
            )));
        }

        let new_role = NewRole {
            code,
            name: validate_role_name(name)?,
            description: description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        };

        let role = self.store.create_role(&new_role).await?;
        // Drop any entry left behind by a deleted role with the same code.
        self.resolver.invalidate(&role.code).await;
        info!("Created role {}", role.code);
        Ok(role)
    }

    pub async fn update_role(&self, id: Uuid, update: UpdateRole) -> AuthzResult<Role> {
        let update = UpdateRole {
            name: update.name.as_deref().map(validate_role_name).transpose()?,
            description: update.description.map(|d| d.trim().to_string()),
        };
        self.store.update_role(id, &update).await
    }

    pub async fn delete_role(&self, id: Uuid) -> AuthzResult<()> {
        let role = self.store.delete_role(id).await?;
        self.resolver.invalidate(&role.code).await;
        info!("Deleted role {}", role.code);
        Ok(())
    }

    /// Every permission, grouped by module
    pub async fn list_permissions(&self) -> AuthzResult<BTreeMap<String, Vec<Permission>>> {
        let permissions = self
            .store
            .find_permissions(&PermissionFilter::default())
            .await?;

        let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
        for permission in permissions {
            grouped
                .entry(permission.module.clone())
                .or_default()
                .push(permission);
        }
        Ok(grouped)
    }

    pub async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AuthzResult<RoleWithPermissions> {
        let role = self
            .store
            .replace_role_permissions(role_id, permission_ids)
            .await?;
        self.resolver.invalidate(&role.role.code).await;
        info!(
            "Replaced permissions of {} ({} granted)",
            role.role.code,
            role.permissions.len()
        );
        Ok(role)
    }

    pub async fn resolve_permissions(&self, role_code: &str) -> AuthzResult<Vec<String>> {
        self.resolver.get_permissions_for_role(role_code).await
    }

    /// The authorization gate, invoked once per gated operation
    pub async fn decide(
        &self,
        requirement: &OperationRequirement,
        actor: Option<&Actor>,
    ) -> AuthzResult<bool> {
        self.guard.decide(requirement, actor).await
    }
}
