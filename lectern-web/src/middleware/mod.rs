pub mod audit;
pub mod client;
pub mod pipeline;
pub mod rate_limit;
pub mod request_id;

pub use audit::{action_for, entity_type_from_path, is_mutating, AuditEvent, AuditRecorder};
pub use client::ClientInfo;
pub use pipeline::{apply_security, security_pipeline, SecurityPipeline, SecurityStores};
pub use rate_limit::{InMemoryRateLimiter, RateDecision, RateLimitBackend};
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
