//! Error types for RBAC operations

use thiserror::Error;

/// Result type for RBAC operations
pub type RbacResult<T> = Result<T, RbacError>;

/// RBAC-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// Role name is not part of the hierarchy
    #[error("Unknown role: {role_name}")]
    UnknownRole { role_name: String },

    /// Caller's role ranks below the route's minimum
    #[error("Insufficient permissions: requires {required}, has {current}")]
    InsufficientRole { required: String, current: String },
}

impl RbacError {
    pub fn unknown_role(role_name: impl Into<String>) -> Self {
        Self::UnknownRole {
            role_name: role_name.into(),
        }
    }

    /// Check if this is a permission denied error
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::InsufficientRole { .. })
    }
}
