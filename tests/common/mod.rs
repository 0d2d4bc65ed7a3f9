//! Shared harness for pipeline end-to-end tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    routing::{get, post, put},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use lectern_config::SecurityConfig;
use lectern_interfaces::{AuditStore, Clock, ManualClock, OrganizationStore, OwnershipStore};
use lectern_rbac::Role;
use lectern_server::{build_router, default_policies, AppState};
use lectern_web::{RoutePolicy, SecurityPipeline, SecurityStores, TokenIssuer};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "s1";

/// Routes standing in for the CRUD handlers that run behind the pipeline
pub fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/api/students", post(|| async { (StatusCode::CREATED, "created") }))
        .route(
            "/api/students/{id}",
            get(|| async { "student" })
                .put(|| async { "updated" })
                .delete(|| async { StatusCode::NO_CONTENT }),
        )
        .route("/api/books/{id}", put(|| async { "updated" }))
        .route(
            "/api/books/{id}/reject",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "invalid book") }),
        )
        .route("/api/reports", get(|| async { "report" }))
        .route("/api/teacher-area", get(|| async { "teacher area" }))
}

pub fn resource_policies() -> lectern_web::RoutePolicies {
    default_policies()
        .route(Method::GET, "/api/students/{id}", RoutePolicy::new().owned_by("students"))
        .route(
            Method::PUT,
            "/api/students/{id}",
            RoutePolicy::new().require_role(Role::Teacher).owned_by("students"),
        )
        .route(
            Method::DELETE,
            "/api/students/{id}",
            RoutePolicy::new().require_role(Role::Admin).owned_by("students"),
        )
        .route(Method::PUT, "/api/books/{id}", RoutePolicy::new().owned_by("books"))
        .route(Method::GET, "/api/reports", RoutePolicy::new().require_role(Role::Admin))
        .route(Method::GET, "/api/teacher-area", RoutePolicy::new().require_role(Role::Teacher))
}

pub fn security_config() -> SecurityConfig {
    SecurityConfig {
        jwt_secret: Some(SECRET.to_string()),
        ..Default::default()
    }
}

pub struct Harness {
    pub app: Router,
    pub clock: ManualClock,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Harness {
    pub fn new<S>(store: Arc<S>, config: SecurityConfig) -> Self
    where
        S: OrganizationStore + OwnershipStore + AuditStore + 'static,
    {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap());
        let pipeline = SecurityPipeline::new(config, SecurityStores::shared(store.clone()))
            .with_policies(resource_policies())
            .with_clock(Arc::new(clock.clone()));

        let state = AppState {
            pipeline: Arc::new(pipeline),
            audit: store,
        };

        Self {
            app: build_router(state, resource_routes()),
            clock,
        }
    }

    /// A token signed with [`SECRET`], valid for an hour from the harness clock
    pub fn token(&self, subject: &str, organization: &str, role: Role) -> String {
        TokenIssuer::new(SECRET)
            .issue(subject, organization, role, Duration::hours(1), self.clock.now())
            .unwrap()
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>) -> TestResponse {
        self.send_with_headers(method, uri, token, &[]).await
    }

    /// Like [`Harness::send`], with extra request headers
    pub async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("User-Agent", "lectern-e2e/1.0")
            .header("X-Forwarded-For", "203.0.113.7");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response = self
            .app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, headers, body }
    }
}

impl Harness {
    pub fn clock_now(&self) -> chrono::DateTime<Utc> {
        self.clock.now()
    }
}
