//! # Lectern Web
//!
//! The request-security pipeline for Lectern's HTTP API: bearer token
//! verification, organization scoping, role checks, resource ownership,
//! rate limiting and audit recording, packaged as one Axum middleware.
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{routing::delete, Router};
//! use lectern_config::SecurityConfig;
//! use lectern_rbac::Role;
//! use lectern_storage::InMemorySecurityStore;
//! use lectern_web::{apply_security, RoutePolicies, RoutePolicy, SecurityPipeline, SecurityStores};
//! use std::sync::Arc;
//!
//! let policies = RoutePolicies::new().route(
//!     axum::http::Method::DELETE,
//!     "/api/students/{id}",
//!     RoutePolicy::new().require_role(Role::Admin).owned_by("students"),
//! );
//! let stores = SecurityStores::shared(Arc::new(InMemorySecurityStore::new()));
//! let pipeline = Arc::new(SecurityPipeline::new(SecurityConfig::default(), stores).with_policies(policies));
//!
//! let app: Router = apply_security(
//!     Router::new().route("/api/students/{id}", delete(|| async { "deleted" })),
//!     pipeline,
//! );
//! ```

pub mod errors;
pub mod extractors;
pub mod middleware;
pub mod ownership;
pub mod policy;
pub mod scope;
pub mod token;

// Re-export commonly used types and functions
pub use errors::{WebError, WebResult};
pub use extractors::{Identity, OrganizationContext};
pub use middleware::{
    apply_security, request_id_middleware, security_pipeline, AuditRecorder, ClientInfo, InMemoryRateLimiter,
    RateDecision, RateLimitBackend, RequestId, SecurityPipeline, SecurityStores, REQUEST_ID_HEADER,
};
pub use ownership::{OwnershipCheck, OwnershipGuard};
pub use policy::{OwnershipRule, RoutePolicies, RoutePolicy};
pub use scope::{ScopeResolution, ScopeResolver};
pub use token::{bearer_token, verify, Claims, InvalidReason, TokenIssuer, TokenVerification, TokenVerifier};
