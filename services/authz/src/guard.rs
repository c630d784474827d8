//! The allow/deny decision

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::error::AuthzResult;
use crate::models::{Actor, OperationRequirement};
use crate::resolver::PermissionResolver;

/// True iff every required code is granted
pub fn covers(required: &BTreeSet<String>, granted: &[String]) -> bool {
    let granted: HashSet<&str> = granted.iter().map(String::as_str).collect();
    required.iter().all(|code| granted.contains(code.as_str()))
}

#[derive(Clone)]
pub struct AuthorizationGuard {
    resolver: Arc<PermissionResolver>,
}

impl AuthorizationGuard {
    pub fn new(resolver: Arc<PermissionResolver>) -> Self {
        Self { resolver }
    }

    /// Decide whether `actor` may run an operation with `requirement`.
    ///
    /// An empty requirement allows. A missing actor or role denies.
    /// Otherwise every required code must be held by the actor's role.
    /// Denial is `Ok(false)`; an error means the store could not be read.
    pub async fn decide(
        &self,
        requirement: &OperationRequirement,
        actor: Option<&Actor>,
    ) -> AuthzResult<bool> {
        if requirement.required_permissions.is_empty() {
            return Ok(true);
        }

        let Some(role_code) = actor.and_then(Actor::role) else {
            return Ok(false);
        };

        let granted = self.resolver.get_permissions_for_role(role_code).await?;
        Ok(covers(&requirement.required_permissions, &granted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn granted(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_covers_is_conjunctive() {
        let held = granted(&["tasks:read", "tasks:update"]);
        assert!(covers(&set(&["tasks:read"]), &held));
        assert!(covers(&set(&["tasks:read", "tasks:update"]), &held));
        assert!(!covers(&set(&["tasks:read", "tasks:delete"]), &held));
        assert!(covers(&set(&[]), &held));
        assert!(!covers(&set(&["tasks:read"]), &[]));
    }

    #[test]
    fn test_covers_ignores_order_and_duplicates() {
        let held = granted(&["b:x", "a:y", "b:x"]);
        assert!(covers(&set(&["a:y", "b:x"]), &held));
    }
}
