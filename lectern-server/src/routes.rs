//! HTTP routes served next to the security pipeline

use axum::{
    extract::{Query, State},
    middleware::from_fn,
    routing::get,
    Json, Router,
};
use lectern_interfaces::{AuditEntry, AuditStore};
use lectern_rbac::Role;
use lectern_web::{
    apply_security, request_id_middleware, Identity, OrganizationContext, RoutePolicies, RoutePolicy,
    SecurityPipeline, WebError, WebResult,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const DEFAULT_AUDIT_LIMIT: u64 = 50;
const MAX_AUDIT_LIMIT: u64 = 500;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SecurityPipeline>,
    pub audit: Arc<dyn AuditStore>,
}

/// Policies for the routes defined here
pub fn default_policies() -> RoutePolicies {
    RoutePolicies::new().route(
        axum::http::Method::GET,
        "/api/audit",
        RoutePolicy::new().require_role(Role::Admin),
    )
}

/// Assemble the application router with every middleware layer.
///
/// `extra` carries additional API routes (the CRUD handlers); they sit
/// behind the same pipeline.
pub fn build_router(state: AppState, extra: Router<AppState>) -> Router {
    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/mode", get(auth_mode))
        .route("/api/me", get(me))
        .route("/api/organization", get(organization))
        .route("/api/audit", get(audit_log))
        .merge(extra);

    apply_security(api, state.pipeline.clone())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn auth_mode() -> Json<Value> {
    Json(json!({ "mode": "jwt" }))
}

async fn me(identity: Identity) -> Json<Identity> {
    Json(identity)
}

async fn organization(context: OrganizationContext) -> Json<OrganizationContext> {
    Json(context)
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<u64>,
}

async fn audit_log(
    State(state): State<AppState>,
    context: OrganizationContext,
    Query(query): Query<AuditQuery>,
) -> WebResult<Json<Vec<AuditEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT);

    state
        .audit
        .list_for_organization(&context.organization_id, limit)
        .await
        .map(Json)
        .map_err(|e| WebError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use lectern_config::SecurityConfig;
    use lectern_interfaces::Organization;
    use lectern_storage::InMemorySecurityStore;
    use lectern_web::{SecurityStores, TokenIssuer};
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(InMemorySecurityStore::new().with_organization(Organization::new("orgA", "Hillside", true)));
        let config = SecurityConfig {
            jwt_secret: Some("s1".to_string()),
            ..Default::default()
        };
        let pipeline = Arc::new(
            SecurityPipeline::new(config, SecurityStores::shared(store.clone())).with_policies(default_policies()),
        );
        build_router(AppState { pipeline, audit: store }, Router::new())
    }

    fn token(role: Role) -> String {
        TokenIssuer::new("s1")
            .issue("u1", "orgA", role, chrono::Duration::hours(1), chrono::Utc::now())
            .unwrap()
    }

    async fn call(uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_public_discovery_routes() {
        assert_eq!(call("/api/health", None).await, (StatusCode::OK, json!({ "status": "ok" })));
        assert_eq!(call("/api/auth/mode", None).await, (StatusCode::OK, json!({ "mode": "jwt" })));
    }

    #[tokio::test]
    async fn test_me_echoes_identity() {
        let (status, body) = call("/api/me", Some(&token(Role::Teacher))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subjectId"], "u1");
        assert_eq!(body["organizationId"], "orgA");
        assert_eq!(body["role"], "teacher");
    }

    #[tokio::test]
    async fn test_organization_context_is_returned() {
        let (status, body) = call("/api/organization", Some(&token(Role::Readonly))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["organization"]["name"], "Hillside");
    }

    #[tokio::test]
    async fn test_audit_log_requires_admin() {
        let (status, body) = call("/api/audit", Some(&token(Role::Teacher))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["required"], "admin");

        let (status, body) = call("/api/audit?limit=10", Some(&token(Role::Owner))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
