//! In-process role store
//!
//! Same contract as the PostgreSQL store, held behind a single lock so every
//! operation is atomic. Used by tests and single-process deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::RoleStore;
use crate::catalog::{PermissionDef, RoleDef};
use crate::error::{AuthzError, AuthzResult};
use crate::models::{
    NewRole, Permission, PermissionFilter, Role, RoleWithPermissions, UpdateRole,
};

#[derive(Default)]
struct State {
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    links: BTreeSet<(Uuid, Uuid)>,
}

impl State {
    fn role_by_code(&self, code: &str) -> Option<&Role> {
        self.roles.values().find(|r| r.code == code)
    }

    fn codes_for(&self, role_id: Uuid) -> Vec<String> {
        let mut codes: Vec<String> = self
            .links
            .range((role_id, Uuid::nil())..=(role_id, Uuid::from_u128(u128::MAX)))
            .filter_map(|(_, permission_id)| self.permissions.get(permission_id))
            .map(|p| p.code.clone())
            .collect();
        codes.sort();
        codes
    }

    fn with_permissions(&self, role: &Role) -> RoleWithPermissions {
        RoleWithPermissions {
            role: role.clone(),
            permissions: self.codes_for(role.id),
        }
    }
}

/// Role store kept in memory
#[derive(Default)]
pub struct MemoryRoleStore {
    state: RwLock<State>,
    resolve_calls: AtomicUsize,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of permission rows
    pub async fn count_permissions(&self) -> usize {
        self.state.read().await.permissions.len()
    }

    /// Number of role/permission link rows
    pub async fn count_links(&self) -> usize {
        self.state.read().await.links.len()
    }

    /// How many times permission codes were resolved from this store
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn count_roles(&self) -> AuthzResult<u64> {
        Ok(self.state.read().await.roles.len() as u64)
    }

    async fn find_all_roles(&self) -> AuthzResult<Vec<RoleWithPermissions>> {
        let state = self.state.read().await;
        let mut roles: Vec<&Role> = state.roles.values().collect();
        roles.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.code.cmp(&b.code))
        });
        Ok(roles.into_iter().map(|r| state.with_permissions(r)).collect())
    }

    async fn find_role(&self, id: Uuid) -> AuthzResult<Option<RoleWithPermissions>> {
        let state = self.state.read().await;
        Ok(state.roles.get(&id).map(|r| state.with_permissions(r)))
    }

    async fn find_role_by_code(&self, code: &str) -> AuthzResult<Option<RoleWithPermissions>> {
        let state = self.state.read().await;
        Ok(state.role_by_code(code).map(|r| state.with_permissions(r)))
    }

    async fn create_role(&self, new_role: &NewRole) -> AuthzResult<Role> {
        let mut state = self.state.write().await;
        if state.role_by_code(&new_role.code).is_some() {
            return Err(AuthzError::Conflict(format!(
                "Role with code '{}' already exists",
                new_role.code
            )));
        }

        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            code: new_role.code.clone(),
            name: new_role.name.clone(),
            description: new_role.description.clone(),
            is_system: false,
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: Uuid, update: &UpdateRole) -> AuthzResult<Role> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", id)))?;

        if role.is_system {
            return Err(AuthzError::InvalidRequest(format!(
                "System role '{}' cannot be modified",
                role.code
            )));
        }

        if let Some(name) = &update.name {
            role.name = name.clone();
        }
        if let Some(description) = &update.description {
            role.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn delete_role(&self, id: Uuid) -> AuthzResult<Role> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .get(&id)
            .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", id)))?;

        if role.is_system {
            return Err(AuthzError::InvalidRequest(format!(
                "System role '{}' cannot be deleted",
                role.code
            )));
        }

        state.links.retain(|(role_id, _)| *role_id != id);
        state
            .roles
            .remove(&id)
            .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", id)))
    }

    async fn find_permissions(&self, filter: &PermissionFilter) -> AuthzResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| (&a.module, &a.action).cmp(&(&b.module, &b.action)));
        Ok(permissions)
    }

    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AuthzResult<RoleWithPermissions> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&role_id) {
            return Err(AuthzError::NotFound(format!("Role {} not found", role_id)));
        }

        let missing: Vec<String> = permission_ids
            .iter()
            .filter(|id| !state.permissions.contains_key(*id))
            .map(Uuid::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(AuthzError::InvalidRequest(format!(
                "Unknown permission ids: {}",
                missing.join(", ")
            )));
        }

        state.links.retain(|(id, _)| *id != role_id);
        state
            .links
            .extend(permission_ids.iter().map(|permission_id| (role_id, *permission_id)));

        let role = state
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", role_id)))?;
        role.updated_at = Utc::now();
        let role = role.clone();
        Ok(state.with_permissions(&role))
    }

    async fn resolve_role_permission_codes(&self, role_code: &str) -> AuthzResult<Vec<String>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(state
            .role_by_code(role_code)
            .map(|r| state.codes_for(r.id))
            .unwrap_or_default())
    }

    async fn upsert_permission(&self, def: &PermissionDef) -> AuthzResult<Permission> {
        let code = def.code();
        let mut state = self.state.write().await;
        if let Some(existing) = state.permissions.values().find(|p| p.code == code) {
            return Ok(existing.clone());
        }

        let permission = Permission {
            id: Uuid::new_v4(),
            code,
            module: def.module.to_string(),
            action: def.action.to_string(),
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn upsert_role(&self, def: &RoleDef) -> AuthzResult<Role> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.role_by_code(def.code) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            code: def.code.to_string(),
            name: def.name.to_string(),
            description: Some(def.description.to_string()),
            is_system: true,
            is_default: def.is_default,
            created_at: now,
            updated_at: now,
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }
}
