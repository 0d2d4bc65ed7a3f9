//! Role hierarchy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RbacError, RbacResult};

/// Organization member role, declared from least to most privileged.
///
/// The derived `Ord` follows declaration order and therefore matches
/// [`Role::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// View-only access to organization data
    Readonly,
    /// Records reading sessions and manages their own classes
    Teacher,
    /// Manages users, books and classes of the organization
    Admin,
    /// Full control, including organization settings
    Owner,
}

impl Role {
    /// All roles, lowest rank first
    pub const ALL: [Role; 4] = [Role::Readonly, Role::Teacher, Role::Admin, Role::Owner];

    pub fn rank(self) -> u8 {
        match self {
            Role::Readonly => 0,
            Role::Teacher => 1,
            Role::Admin => 2,
            Role::Owner => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Readonly => "readonly",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Whether this role satisfies a route's minimum role
    pub fn satisfies(self, required: Role) -> bool {
        has_permission(self, required)
    }

    /// Check `self` against `required`, producing an error carrying both
    /// role names on failure
    pub fn require(self, required: Role) -> RbacResult<()> {
        if self.satisfies(required) {
            Ok(())
        } else {
            Err(RbacError::InsufficientRole {
                required: required.to_string(),
                current: self.to_string(),
            })
        }
    }
}

/// `true` iff `rank(actual) >= rank(required)`
pub fn has_permission(actual: Role, required: Role) -> bool {
    actual.rank() >= required.rank()
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "readonly" => Ok(Role::Readonly),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            _ => Err(RbacError::unknown_role(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_permission_matches_rank_for_every_pair() {
        for actual in Role::ALL {
            for required in Role::ALL {
                assert_eq!(
                    has_permission(actual, required),
                    actual.rank() >= required.rank(),
                    "{} vs {}",
                    actual,
                    required
                );
            }
        }
    }

    #[test]
    fn test_has_permission_is_reflexive() {
        for role in Role::ALL {
            assert!(has_permission(role, role));
        }
    }

    #[test]
    fn test_has_permission_is_transitive() {
        for a in Role::ALL {
            for b in Role::ALL {
                for c in Role::ALL {
                    if has_permission(a, b) && has_permission(b, c) {
                        assert!(has_permission(a, c));
                    }
                }
            }
        }
    }

    #[test]
    fn test_derived_order_matches_rank() {
        assert!(Role::Readonly < Role::Teacher);
        assert!(Role::Teacher < Role::Admin);
        assert!(Role::Admin < Role::Owner);
    }

    #[test]
    fn test_require_reports_both_roles() {
        let err = Role::Teacher.require(Role::Admin).unwrap_err();
        assert_eq!(
            err,
            RbacError::InsufficientRole {
                required: "admin".to_string(),
                current: "teacher".to_string(),
            }
        );
        assert!(err.is_permission_denied());
        assert!(Role::Teacher.require(Role::Teacher).is_ok());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("Owner".parse::<Role>().unwrap(), Role::Owner);
        assert!("superuser".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"readonly\"").unwrap();
        assert_eq!(role, Role::Readonly);
    }
}
