//! Request-scoped security context and its Axum extractors
//!
//! The pipeline writes [`Identity`] and [`OrganizationContext`] into the
//! request extensions once; handlers read them through these extractors and
//! never decode the token themselves.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};
use lectern_interfaces::Organization;
use lectern_rbac::Role;
use serde::Serialize;

use crate::errors::WebError;
use crate::token::Claims;

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub subject_id: String,
    pub organization_id: String,
    pub role: Role,
    pub expiry: DateTime<Utc>,
}

impl Identity {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            subject_id: claims.sub.clone(),
            organization_id: claims.org.clone(),
            role: claims.role,
            expiry: DateTime::from_timestamp(claims.exp, 0).unwrap_or_default(),
        }
    }

    /// Key under which this caller is rate limited
    pub fn rate_limit_key(&self) -> String {
        format!("user:{}", self.subject_id)
    }
}

/// Outcome of organization scoping for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationContext {
    pub organization_id: String,
    /// `None` when the store could not answer and scoping was permissive
    pub organization: Option<Organization>,
}

impl OrganizationContext {
    /// Whether the organization was confirmed active
    pub fn is_verified(&self) -> bool {
        self.organization.is_some()
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| WebError::internal("Identity not found. Ensure the security pipeline is enabled."))
    }
}

impl<S> FromRequestParts<S> for OrganizationContext
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OrganizationContext>()
            .cloned()
            .ok_or_else(|| {
                WebError::internal("Organization context not found. Ensure the security pipeline is enabled.")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_missing_context_is_an_internal_error() {
        let (mut parts, _) = Request::new(()).into_parts();

        let err = Identity::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(OrganizationContext::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn test_identity_is_read_from_extensions() {
        let identity = Identity {
            subject_id: "u1".to_string(),
            organization_id: "orgA".to_string(),
            role: Role::Teacher,
            expiry: DateTime::from_timestamp(1_900_000_000, 0).unwrap(),
        };
        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(identity.clone());

        assert_eq!(Identity::from_request_parts(&mut parts, &()).await.unwrap(), identity);
        assert_eq!(identity.rate_limit_key(), "user:u1");
    }
}
