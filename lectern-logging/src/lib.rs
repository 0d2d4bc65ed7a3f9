//! Structured logging infrastructure for Lectern
//!
//! All crates log through `tracing`. This crate installs the global
//! subscriber once, at process start, from [`LoggingConfig`].
//!
//! Audit records are emitted on the [`AUDIT_TARGET`] target so they can be
//! filtered or routed separately (`RUST_LOG=audit=info`).

pub mod init;

pub use init::{build_env_filter, init_logging};
pub use lectern_config::{LogFormat, LogLevel, LoggingConfig};

/// Tracing target used for audit-trail events
pub const AUDIT_TARGET: &str = "audit";
