//! Role and permission models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Permission entity. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub code: String,
    pub module: String,
    pub action: String,
}

/// Role entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role together with the codes of the permissions linked to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<String>,
}

/// New custom role payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

/// Role update payload. The code is never updatable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub name: Option<String>,
    /// `None` keeps the description, an empty string clears it
    pub description: Option<String>,
}

/// Optional filter for permission listing
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionFilter {
    pub module: Option<String>,
    pub action: Option<String>,
}

impl PermissionFilter {
    pub fn matches(&self, permission: &Permission) -> bool {
        self.module.as_deref().is_none_or(|m| m == permission.module)
            && self.action.as_deref().is_none_or(|a| a == permission.action)
    }
}

/// The caller being authorized, as supplied by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role_code: Option<String>,
}

impl Actor {
    pub fn new(id: Uuid, role_code: impl Into<String>) -> Self {
        Self {
            id,
            role_code: Some(role_code.into()),
        }
    }

    /// The role code if it is present and not blank
    pub fn role(&self) -> Option<&str> {
        self.role_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// Permissions an operation declares it needs, resolved by the routing layer
/// ahead of invocation. An empty set means the operation is not gated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OperationRequirement {
    #[serde(default)]
    pub required_permissions: BTreeSet<String>,
}

impl OperationRequirement {
    /// An operation that declares no permission requirement
    pub fn none() -> Self {
        Self::default()
    }

    /// An operation requiring every one of `codes`
    pub fn all_of<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_permissions: codes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of a seeding run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub permissions: usize,
    pub roles: usize,
}

/// Canonical form of a role code
pub fn canonical_role_code(code: &str) -> String {
    code.trim().to_uppercase()
}
