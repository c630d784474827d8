//! PostgreSQL role store

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{FromRow, PgPool, Row, postgres::PgRow};
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use super::RoleStore;
use crate::catalog::{PermissionDef, RoleDef};
use crate::error::{AuthzError, AuthzResult};
use crate::models::{
    NewRole, Permission, PermissionFilter, Role, RoleWithPermissions, UpdateRole,
};

const ROLE_COLUMNS: &str =
    "id, code, name, description, is_system, is_default, created_at, updated_at";

/// Select roles with their aggregated permission codes, filtered by `condition`
fn roles_with_permissions_query(condition: &str) -> String {
    format!(
        r#"
        SELECT r.id, r.code, r.name, r.description, r.is_system, r.is_default,
               r.created_at, r.updated_at,
               COALESCE(
                   ARRAY_AGG(p.code::TEXT ORDER BY p.code) FILTER (WHERE p.code IS NOT NULL),
                   ARRAY[]::TEXT[]
               ) AS permissions
        FROM roles r
        LEFT JOIN role_permissions rp ON rp.role_id = r.id
        LEFT JOIN permissions p ON p.id = rp.permission_id
        {}
        GROUP BY r.id
        ORDER BY r.created_at, r.code
        "#,
        condition
    )
}

fn role_with_permissions(row: &PgRow) -> Result<RoleWithPermissions, sqlx::Error> {
    Ok(RoleWithPermissions {
        role: Role::from_row(row)?,
        permissions: row.try_get("permissions")?,
    })
}

/// Apply the schema migrations shipped with this crate
pub async fn migrate(pool: &PgPool) -> DatabaseResult<()> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))
}

/// Role store backed by PostgreSQL
#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    /// Create a new role store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_role(&self, id: Uuid) -> AuthzResult<Role> {
        sqlx::query_as::<_, Role>(&format!("SELECT {} FROM roles WHERE id = $1", ROLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", id)))
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn count_roles(&self) -> AuthzResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn find_all_roles(&self) -> AuthzResult<Vec<RoleWithPermissions>> {
        let rows = sqlx::query(&roles_with_permissions_query(""))
            .fetch_all(&self.pool)
            .await?;

        let roles = rows
            .iter()
            .map(role_with_permissions)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roles)
    }

    async fn find_role(&self, id: Uuid) -> AuthzResult<Option<RoleWithPermissions>> {
        let row = sqlx::query(&roles_with_permissions_query("WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(role_with_permissions).transpose()?)
    }

    async fn find_role_by_code(&self, code: &str) -> AuthzResult<Option<RoleWithPermissions>> {
        let row = sqlx::query(&roles_with_permissions_query("WHERE r.code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(role_with_permissions).transpose()?)
    }

    async fn create_role(&self, new_role: &NewRole) -> AuthzResult<Role> {
        info!("Creating role: {}", new_role.code);

        let result = sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (id, code, name, description, is_system, is_default)
            VALUES ($1, $2, $3, $4, FALSE, FALSE)
            RETURNING {}
            "#,
            ROLE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_role.code)
        .bind(&new_role.name)
        .bind(&new_role.description)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(role) => Ok(role),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                AuthzError::Conflict(format!("Role with code '{}' already exists", new_role.code)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_role(&self, id: Uuid, update: &UpdateRole) -> AuthzResult<Role> {
        let role = self.fetch_role(id).await?;
        if role.is_system {
            return Err(AuthzError::InvalidRequest(format!(
                "System role '{}' cannot be modified",
                role.code
            )));
        }

        sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = CASE WHEN $3::TEXT IS NULL THEN description ELSE NULLIF($3, '') END,
                updated_at = NOW()
            WHERE id = $1 AND is_system = FALSE
            RETURNING {}
            "#,
            ROLE_COLUMNS
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", id)))
    }

    async fn delete_role(&self, id: Uuid) -> AuthzResult<Role> {
        let role = self.fetch_role(id).await?;
        if role.is_system {
            return Err(AuthzError::InvalidRequest(format!(
                "System role '{}' cannot be deleted",
                role.code
            )));
        }

        info!("Deleting role: {}", role.code);
        let result = sqlx::query("DELETE FROM roles WHERE id = $1 AND is_system = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthzError::NotFound(format!("Role {} not found", id)));
        }
        Ok(role)
    }

    async fn find_permissions(&self, filter: &PermissionFilter) -> AuthzResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT id, code, module, action
            FROM permissions
            WHERE ($1::TEXT IS NULL OR module = $1)
              AND ($2::TEXT IS NULL OR action = $2)
            ORDER BY module, action
            "#,
        )
        .bind(&filter.module)
        .bind(&filter.action)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AuthzResult<RoleWithPermissions> {
        let ids: Vec<Uuid> = permission_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
                .bind(role_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AuthzError::NotFound(format!("Role {} not found", role_id)));
        }

        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM permissions WHERE id = ANY($1)")
            .bind(ids.as_slice())
            .fetch_all(&mut *tx)
            .await?;
        if found.len() != ids.len() {
            let found: BTreeSet<Uuid> = found.into_iter().collect();
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.contains(*id))
                .map(Uuid::to_string)
                .collect();
            return Err(AuthzError::InvalidRequest(format!(
                "Unknown permission ids: {}",
                missing.join(", ")
            )));
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        if !ids.is_empty() {
            sqlx::query(
                "INSERT INTO role_permissions (role_id, permission_id) SELECT $1, UNNEST($2::UUID[])",
            )
            .bind(role_id)
            .bind(ids.as_slice())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE roles SET updated_at = NOW() WHERE id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_role(role_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", role_id)))
    }

    async fn resolve_role_permission_codes(&self, role_code: &str) -> AuthzResult<Vec<String>> {
        let codes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT p.code
            FROM roles r
            JOIN role_permissions rp ON rp.role_id = r.id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE r.code = $1
            ORDER BY p.code
            "#,
        )
        .bind(role_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn upsert_permission(&self, def: &PermissionDef) -> AuthzResult<Permission> {
        // The no-op update makes RETURNING yield the existing row.
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (id, code, module, action)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO UPDATE SET code = EXCLUDED.code
            RETURNING id, code, module, action
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(def.code())
        .bind(def.module)
        .bind(def.action)
        .fetch_one(&self.pool)
        .await?;

        Ok(permission)
    }

    async fn upsert_role(&self, def: &RoleDef) -> AuthzResult<Role> {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (id, code, name, description, is_system, is_default)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            ON CONFLICT (code) DO UPDATE SET code = EXCLUDED.code
            RETURNING {}
            "#,
            ROLE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(def.code)
        .bind(def.name)
        .bind(def.description)
        .bind(def.is_default)
        .fetch_one(&self.pool)
        .await?;

        Ok(role)
    }
}
