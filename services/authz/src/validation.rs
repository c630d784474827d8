//! Input validation for custom roles

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AuthzError, AuthzResult};
use crate::models::canonical_role_code;

const MAX_NAME_LENGTH: usize = 100;

/// Validate a role code and return its canonical (upper-case) form
pub fn validate_role_code(code: &str) -> AuthzResult<String> {
    let code = canonical_role_code(code);

    if code.is_empty() {
        return Err(AuthzError::InvalidRequest("Role code is required".to_string()));
    }

    static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = CODE_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Z][A-Z0-9_]{1,49}$").expect("Failed to compile role code regex")
    });

    if !regex.is_match(&code) {
        return Err(AuthzError::InvalidRequest(format!(
            "Role code '{}' must be 2 to 50 characters of letters, digits and underscores, starting with a letter",
            code
        )));
    }

    Ok(code)
}

/// Validate a role name and return it trimmed
pub fn validate_role_name(name: &str) -> AuthzResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(AuthzError::InvalidRequest("Role name is required".to_string()));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthzError::InvalidRequest(format!(
            "Role name must be at most {} characters long",
            MAX_NAME_LENGTH
        )));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_code_is_canonicalized() {
        assert_eq!(validate_role_code("  auditor_2 ").unwrap(), "AUDITOR_2");
    }

    #[test]
    fn test_role_code_rejections() {
        let too_long = "X".repeat(51);
        for bad in ["", "A", "2FAST", "WITH-DASH", "WITH SPACE", too_long.as_str()] {
            assert!(
                matches!(validate_role_code(bad), Err(AuthzError::InvalidRequest(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_role_name() {
        assert_eq!(validate_role_name("  Auditeur  ").unwrap(), "Auditeur");
        assert!(validate_role_name(" ").is_err());
        assert!(validate_role_name(&"é".repeat(100)).is_ok());
        assert!(validate_role_name(&"é".repeat(101)).is_err());
    }
}
