//! Organization scope resolution

use lectern_config::ScopeEnforcement;
use lectern_interfaces::{Organization, OrganizationStore};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::errors::{WebError, WebResult};
use crate::extractors::{Identity, OrganizationContext};

/// Where the caller's organization stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeResolution {
    Active(Organization),
    Inactive(Organization),
    NotFound,
    /// The store could not answer and enforcement is permissive
    Unknown,
}

/// Confirms the claimed organization exists and is active
#[derive(Clone)]
pub struct ScopeResolver {
    store: Arc<dyn OrganizationStore>,
    enforcement: ScopeEnforcement,
}

impl ScopeResolver {
    pub fn new(store: Arc<dyn OrganizationStore>, enforcement: ScopeEnforcement) -> Self {
        Self { store, enforcement }
    }

    /// Look up the caller's organization.
    ///
    /// Fails only when the store cannot answer under strict enforcement, or
    /// when it refused the query outright.
    pub async fn resolve(&self, identity: &Identity) -> WebResult<ScopeResolution> {
        match self.store.find_organization(&identity.organization_id).await {
            Ok(Some(organization)) if organization.is_active => Ok(ScopeResolution::Active(organization)),
            Ok(Some(organization)) => Ok(ScopeResolution::Inactive(organization)),
            Ok(None) => Ok(ScopeResolution::NotFound),
            Err(e) if e.is_unanswered() => match self.enforcement {
                ScopeEnforcement::Permissive => {
                    warn!(
                        organization_id = %identity.organization_id,
                        "Organization lookup failed, continuing unscoped: {}", e
                    );
                    Ok(ScopeResolution::Unknown)
                }
                ScopeEnforcement::Strict => {
                    warn!(
                        organization_id = %identity.organization_id,
                        "Organization lookup failed under strict scoping: {}", e
                    );
                    Err(WebError::service_unavailable("Organization lookup unavailable"))
                }
            },
            Err(e) => {
                error!("Organization lookup rejected: {}", e);
                Err(WebError::internal(e.to_string()))
            }
        }
    }

    /// Resolve and turn the outcome into the request's organization context
    pub async fn enforce(&self, identity: &Identity) -> WebResult<OrganizationContext> {
        let organization = match self.resolve(identity).await? {
            ScopeResolution::Active(organization) => Some(organization),
            ScopeResolution::Unknown => None,
            ScopeResolution::Inactive(_) => {
                warn!(organization_id = %identity.organization_id, "Rejected request for inactive organization");
                return Err(WebError::forbidden("Organization is inactive"));
            }
            ScopeResolution::NotFound => {
                warn!(organization_id = %identity.organization_id, "Rejected request for unknown organization");
                return Err(WebError::not_found("Organization not found"));
            }
        };

        debug!(organization_id = %identity.organization_id, "Organization scope resolved");
        Ok(OrganizationContext {
            organization_id: identity.organization_id.clone(),
            organization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::Utc;
    use lectern_interfaces::{StoreError, StoreResult};
    use lectern_rbac::Role;
    use mockall::mock;

    mock! {
        Organizations {}

        #[async_trait]
        impl OrganizationStore for Organizations {
            async fn find_organization(&self, organization_id: &str) -> StoreResult<Option<Organization>>;
        }
    }

    fn identity() -> Identity {
        Identity {
            subject_id: "u1".to_string(),
            organization_id: "orgA".to_string(),
            role: Role::Teacher,
            expiry: Utc::now(),
        }
    }

    fn resolver(result: StoreResult<Option<Organization>>, enforcement: ScopeEnforcement) -> ScopeResolver {
        let mut store = MockOrganizations::new();
        store
            .expect_find_organization()
            .withf(|id| id == "orgA")
            .times(1)
            .returning(move |_| result.clone());
        ScopeResolver::new(Arc::new(store), enforcement)
    }

    #[tokio::test]
    async fn test_active_organization_is_placed_in_context() {
        let org = Organization::new("orgA", "Hillside", true);
        let context = resolver(Ok(Some(org.clone())), ScopeEnforcement::Strict)
            .enforce(&identity())
            .await
            .unwrap();

        assert_eq!(context.organization, Some(org));
        assert!(context.is_verified());
    }

    #[tokio::test]
    async fn test_inactive_and_missing_organizations_are_rejected() {
        let inactive = Organization::new("orgA", "Hillside", false);
        let err = resolver(Ok(Some(inactive)), ScopeEnforcement::Permissive)
            .enforce(&identity())
            .await
            .unwrap_err();
        assert_eq!(err, WebError::forbidden("Organization is inactive"));

        let err = resolver(Ok(None), ScopeEnforcement::Permissive)
            .enforce(&identity())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_permissive_scoping_fails_open() {
        let resolver = resolver(Err(StoreError::missing_table("organizations")), ScopeEnforcement::Permissive);

        let context = resolver.enforce(&identity()).await.unwrap();
        assert_eq!(context.organization_id, "orgA");
        assert!(!context.is_verified());
    }

    #[tokio::test]
    async fn test_strict_scoping_fails_closed() {
        let resolver = resolver(Err(StoreError::unavailable("timeout")), ScopeEnforcement::Strict);

        let err = resolver.resolve(&identity()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_refused_query_is_never_failed_open() {
        let resolver = resolver(Err(StoreError::invalid_query("bad")), ScopeEnforcement::Permissive);

        let err = resolver.resolve(&identity()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
