//! Lectern API server
//!
//! Wires configuration, logging, storage and the security pipeline into one
//! Axum application.

pub mod routes;
pub mod startup;

pub use routes::{build_router, default_policies, AppState};
pub use startup::{build_pipeline, serve, shutdown_signal};
