//! Role store doubles for tests

use async_trait::async_trait;
use uuid::Uuid;

use super::{MemoryRoleStore, RoleStore};
use crate::catalog::{PermissionDef, RoleDef};
use crate::error::{AuthzError, AuthzResult};
use crate::models::{
    NewRole, Permission, PermissionFilter, Role, RoleWithPermissions, UpdateRole,
};

/// Memory store that refuses to create one role
pub(crate) struct RefusingStore {
    inner: MemoryRoleStore,
    refused: &'static str,
}

impl RefusingStore {
    pub(crate) fn new(refused: &'static str) -> Self {
        Self {
            inner: MemoryRoleStore::new(),
            refused,
        }
    }
}

#[async_trait]
impl RoleStore for RefusingStore {
    async fn count_roles(&self) -> AuthzResult<u64> {
        self.inner.count_roles().await
    }

    async fn find_all_roles(&self) -> AuthzResult<Vec<RoleWithPermissions>> {
        self.inner.find_all_roles().await
    }

    async fn find_role(&self, id: Uuid) -> AuthzResult<Option<RoleWithPermissions>> {
        self.inner.find_role(id).await
    }

    async fn find_role_by_code(&self, code: &str) -> AuthzResult<Option<RoleWithPermissions>> {
        self.inner.find_role_by_code(code).await
    }

    async fn create_role(&self, new_role: &NewRole) -> AuthzResult<Role> {
        self.inner.create_role(new_role).await
    }

    async fn update_role(&self, id: Uuid, update: &UpdateRole) -> AuthzResult<Role> {
        self.inner.update_role(id, update).await
    }

    async fn delete_role(&self, id: Uuid) -> AuthzResult<Role> {
        self.inner.delete_role(id).await
    }

    async fn find_permissions(&self, filter: &PermissionFilter) -> AuthzResult<Vec<Permission>> {
        self.inner.find_permissions(filter).await
    }

    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AuthzResult<RoleWithPermissions> {
        self.inner.replace_role_permissions(role_id, permission_ids).await
    }

    async fn resolve_role_permission_codes(&self, role_code: &str) -> AuthzResult<Vec<String>> {
        self.inner.resolve_role_permission_codes(role_code).await
    }

    async fn upsert_permission(&self, def: &PermissionDef) -> AuthzResult<Permission> {
        self.inner.upsert_permission(def).await
    }

    async fn upsert_role(&self, def: &RoleDef) -> AuthzResult<Role> {
        if def.code == self.refused {
            return Err(AuthzError::InvalidRequest(format!("refused {}", def.code)));
        }
        self.inner.upsert_role(def).await
    }
}
