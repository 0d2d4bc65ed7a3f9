//! The request-security pipeline.
//!
//! Stages run in a fixed order and the first rejection answers the request:
//!
//! 1. public allow-list (exact path match; only IP rate limiting applies)
//! 2. bearer token verification
//! 3. organization scope
//! 4. minimum role, if the route declares one
//! 5. resource ownership, if the route declares one
//! 6. per-identity rate limit
//! 7. the handler, then the audit record for successful mutations
//!
//! Rate limiting comes last so that unauthenticated callers never touch
//! another identity's quota. Public traffic is counted by a separate limiter,
//! so address keys can never evict identity counters.

use axum::{
    extract::{FromRequestParts, MatchedPath, RawPathParams, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Router,
};
use lectern_config::SecurityConfig;
use lectern_interfaces::{AuditStore, Clock, OrganizationStore, OwnershipStore, SystemClock};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::errors::{WebError, WebResult};
use crate::extractors::Identity;
use crate::middleware::audit::{action_for, entity_type_from_path, is_mutating, AuditEvent, AuditRecorder};
use crate::middleware::rate_limit::{InMemoryRateLimiter, RateDecision, RateLimitBackend};
use crate::middleware::ClientInfo;
use crate::ownership::OwnershipGuard;
use crate::policy::{RoutePolicies, RoutePolicy};
use crate::scope::ScopeResolver;
use crate::token::{bearer_token, InvalidReason, TokenVerification, TokenVerifier};

/// Stores the pipeline reads from and writes to
#[derive(Clone)]
pub struct SecurityStores {
    pub organizations: Arc<dyn OrganizationStore>,
    pub ownership: Arc<dyn OwnershipStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl SecurityStores {
    /// Use one store for every concern
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: OrganizationStore + OwnershipStore + AuditStore + 'static,
    {
        Self {
            organizations: store.clone(),
            ownership: store.clone(),
            audit: store,
        }
    }
}

/// Assembled stages plus the route policy table
pub struct SecurityPipeline {
    config: SecurityConfig,
    verifier: Option<TokenVerifier>,
    scope: ScopeResolver,
    ownership: OwnershipGuard,
    audit: AuditRecorder,
    rate_limiter: Arc<dyn RateLimitBackend>,
    public_rate_limiter: Arc<dyn RateLimitBackend>,
    policies: RoutePolicies,
    clock: Arc<dyn Clock>,
}

/// How a request left the pre-handler stages
enum Admission {
    Public,
    Authenticated {
        identity: Identity,
        audit: Option<AuditEvent>,
    },
}

impl SecurityPipeline {
    pub fn new(config: SecurityConfig, stores: SecurityStores) -> Self {
        let verifier = config.jwt_secret.as_deref().map(|secret| {
            TokenVerifier::new(secret)
                .with_issuer(config.jwt_issuer.clone())
                .with_audience(config.jwt_audience.clone())
        });

        Self {
            verifier,
            scope: ScopeResolver::new(stores.organizations, config.scope_enforcement),
            ownership: OwnershipGuard::new(stores.ownership, config.scope_enforcement),
            audit: AuditRecorder::new(stores.audit, config.audit.enabled),
            rate_limiter: Arc::new(InMemoryRateLimiter::from_config(&config.rate_limit)),
            public_rate_limiter: Arc::new(InMemoryRateLimiter::from_config(&config.rate_limit)),
            policies: RoutePolicies::new(),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_policies(mut self, policies: RoutePolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve the caller from the `Authorization` header
    pub fn authenticate(&self, headers: &HeaderMap) -> WebResult<Identity> {
        let verifier = self.verifier.as_ref().ok_or_else(|| {
            error!("JWT secret is not configured; refusing authenticated request");
            WebError::configuration("Server authentication is not configured")
        })?;

        let token =
            bearer_token(headers).ok_or_else(|| WebError::unauthorized("Missing or invalid authorization header"))?;

        match verifier.verify(token, self.clock.now()) {
            TokenVerification::Valid(claims) => {
                let identity = Identity::from_claims(&claims);
                debug!(
                    subject_id = %identity.subject_id,
                    organization_id = %identity.organization_id,
                    role = %identity.role,
                    "Token verified"
                );
                Ok(identity)
            }
            TokenVerification::Invalid(InvalidReason::Expired) => {
                debug!("Rejected expired token");
                Err(WebError::unauthorized("Token expired"))
            }
            TokenVerification::Invalid(reason) => {
                warn!(%reason, "Rejected invalid token");
                Err(WebError::unauthorized("Invalid token"))
            }
        }
    }

    async fn check_rate(&self, limiter: &dyn RateLimitBackend, key: &str, max_requests: u32) -> WebResult<()> {
        if !self.config.rate_limit.enabled {
            return Ok(());
        }

        match limiter.hit(key, max_requests, self.clock.now()).await {
            RateDecision::Allowed { .. } => Ok(()),
            RateDecision::Limited { retry_after } => {
                warn!(key, retry_after, "Rate limit exceeded");
                Err(WebError::TooManyRequests { retry_after })
            }
        }
    }

    async fn admit(&self, parts: &mut Parts) -> WebResult<Admission> {
        let path = parts.uri.path().to_string();
        let client = ClientInfo::from_parts(parts, self.config.trust_proxy_headers);

        if self.config.is_public_path(&path) {
            self.check_rate(
                self.public_rate_limiter.as_ref(),
                &client.rate_limit_key(),
                self.config.rate_limit.public_max_requests,
            )
            .await?;
            debug!(path = %path, "Public path, authentication skipped");
            return Ok(Admission::Public);
        }

        let identity = self.authenticate(&parts.headers)?;
        let organization = self.scope.enforce(&identity).await?;

        let policy: Option<RoutePolicy> = parts
            .extensions
            .get::<MatchedPath>()
            .and_then(|matched| self.policies.get(&parts.method, matched.as_str()))
            .cloned();

        if let Some(required) = policy.as_ref().and_then(|p| p.min_role) {
            identity.role.require(required).map_err(|e| {
                warn!(subject_id = %identity.subject_id, path = %path, "{}", e);
                WebError::from(e)
            })?;
        }

        let mut entity_id = None;
        if let Some(rule) = policy.as_ref().and_then(|p| p.ownership.as_ref()) {
            let resource_id = path_param(parts, &rule.param)
                .await
                .ok_or_else(|| WebError::internal(format!("Route parameter '{}' is missing", rule.param)))?;
            self.ownership
                .enforce(&rule.table, &resource_id, &identity.organization_id)
                .await?;
            entity_id = Some(resource_id);
        } else if is_mutating(&parts.method) {
            entity_id = path_param(parts, "id").await;
        }

        self.check_rate(
            self.rate_limiter.as_ref(),
            &identity.rate_limit_key(),
            self.config.rate_limit.max_requests,
        )
        .await?;

        let audit = (self.audit.is_enabled() && is_mutating(&parts.method)).then(|| {
            let entity_type = policy
                .as_ref()
                .and_then(|p| {
                    p.audit_entity_type
                        .clone()
                        .or_else(|| p.ownership.as_ref().map(|rule| rule.table.clone()))
                })
                .or_else(|| entity_type_from_path(&path).map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string());
            let action = policy
                .as_ref()
                .and_then(|p| p.audit_action.clone())
                .unwrap_or_else(|| action_for(&parts.method).to_string());

            AuditEvent {
                action,
                entity_type,
                entity_id,
                client,
            }
        });

        parts.extensions.insert(identity.clone());
        parts.extensions.insert(organization);

        Ok(Admission::Authenticated { identity, audit })
    }
}

async fn path_param(parts: &mut Parts, name: &str) -> Option<String> {
    let params = RawPathParams::from_request_parts(parts, &()).await.ok()?;
    params
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Axum middleware running every pipeline stage around the handler.
///
/// Install with [`apply_security`] (or `Router::layer`) so it runs after
/// routing and sees the matched route pattern.
pub async fn security_pipeline(
    State(pipeline): State<Arc<SecurityPipeline>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    match pipeline.admit(&mut parts).await {
        Ok(Admission::Public) => next.run(Request::from_parts(parts, body)).await,
        Ok(Admission::Authenticated { identity, audit }) => {
            let response = next.run(Request::from_parts(parts, body)).await;
            if let Some(event) = audit {
                pipeline
                    .audit
                    .record(&identity, event, response.status(), pipeline.clock.now())
                    .await;
            }
            response
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Wrap every route of `router` (and its fallback) in the pipeline
pub fn apply_security<S>(router: Router<S>, pipeline: Arc<SecurityPipeline>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(pipeline, security_pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get};
    use chrono::{Duration, TimeZone, Utc};
    use lectern_interfaces::{ManualClock, Organization};
    use lectern_rbac::Role;
    use lectern_storage::InMemorySecurityStore;
    use tower::ServiceExt;

    use crate::token::TokenIssuer;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap())
    }

    fn pipeline(secret: Option<&str>, clock: &ManualClock) -> Arc<SecurityPipeline> {
        let store = InMemorySecurityStore::new().with_organization(Organization::new("orgA", "Hillside", true));
        let config = SecurityConfig {
            jwt_secret: secret.map(str::to_string),
            ..Default::default()
        };
        Arc::new(
            SecurityPipeline::new(config, SecurityStores::shared(Arc::new(store)))
                .with_clock(Arc::new(clock.clone())),
        )
    }

    fn app(pipeline: Arc<SecurityPipeline>) -> Router {
        let router = Router::new()
            .route("/api/health", get(|| async { "ok" }))
            .route("/api/me", get(|identity: Identity| async move { identity.subject_id }));
        apply_security(router, pipeline)
    }

    fn get_request(uri: &str, token: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_public_path_needs_no_token() {
        let clock = clock();
        let response = app(pipeline(Some("s1"), &clock))
            .oneshot(get_request("/api/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_identity_reaches_the_handler() {
        let clock = clock();
        let token = TokenIssuer::new("s1")
            .issue("u1", "orgA", Role::Readonly, Duration::hours(1), clock.now())
            .unwrap();

        let response = app(pipeline(Some("s1"), &clock))
            .oneshot(get_request("/api/me", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"u1");
    }

    #[tokio::test]
    async fn test_missing_secret_is_a_server_error() {
        let clock = clock();
        let response = app(pipeline(None, &clock))
            .oneshot(get_request("/api/me", Some("whatever")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let clock = clock();
        let token = TokenIssuer::new("s1")
            .issue("u1", "orgA", Role::Teacher, Duration::minutes(5), clock.now())
            .unwrap();
        clock.advance(Duration::minutes(5));

        let response = app(pipeline(Some("s1"), &clock))
            .oneshot(get_request("/api/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_still_requires_authentication() {
        let clock = clock();
        let response = app(pipeline(Some("s1"), &clock))
            .oneshot(get_request("/api/nowhere", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
