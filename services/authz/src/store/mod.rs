//! Durable storage for roles, permissions and role/permission links
//!
//! The persistent store is the sole source of truth. Codes handed to the
//! store are expected in canonical form; validation happens in the service.

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{PermissionDef, RoleDef};
use crate::error::AuthzResult;
use crate::models::{
    NewRole, Permission, PermissionFilter, Role, RoleWithPermissions, UpdateRole,
};

pub mod memory;
pub mod postgres;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryRoleStore;
pub use postgres::PgRoleStore;

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn count_roles(&self) -> AuthzResult<u64>;

    async fn find_all_roles(&self) -> AuthzResult<Vec<RoleWithPermissions>>;

    async fn find_role(&self, id: Uuid) -> AuthzResult<Option<RoleWithPermissions>>;

    async fn find_role_by_code(&self, code: &str) -> AuthzResult<Option<RoleWithPermissions>>;

    /// Create a custom role. Fails `Conflict` if the code is taken.
    async fn create_role(&self, new_role: &NewRole) -> AuthzResult<Role>;

    /// Update name and/or description. Fails `NotFound`, or
    /// `InvalidRequest` for system roles.
    async fn update_role(&self, id: Uuid, update: &UpdateRole) -> AuthzResult<Role>;

    /// Delete a custom role and its links, returning the deleted row.
    /// Fails `NotFound`, or `InvalidRequest` for system roles.
    async fn delete_role(&self, id: Uuid) -> AuthzResult<Role>;

    async fn find_permissions(&self, filter: &PermissionFilter) -> AuthzResult<Vec<Permission>>;

    /// Replace every link of a role with links to `permission_ids`.
    ///
    /// All-or-nothing: fails `NotFound` for an unknown role and
    /// `InvalidRequest` if any id is unknown, leaving the links untouched.
    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AuthzResult<RoleWithPermissions>;

    /// Codes granted to the role with this code; empty for an unknown role.
    async fn resolve_role_permission_codes(&self, role_code: &str) -> AuthzResult<Vec<String>>;

    /// Create the permission if its code is absent, otherwise return the
    /// existing row unchanged.
    async fn upsert_permission(&self, def: &PermissionDef) -> AuthzResult<Permission>;

    /// Create the system role if its code is absent, otherwise return the
    /// existing row unchanged.
    async fn upsert_role(&self, def: &RoleDef) -> AuthzResult<Role>;
}
