//! Domain-driven configuration management for Lectern
//!
//! Configuration is split by functional domain (server, database, logging,
//! security), loaded from YAML or the environment, and validated before use.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    database::DatabaseConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    security::{AuditConfig, RateLimitConfig, ScopeEnforcement, SecurityConfig, DEFAULT_PUBLIC_PATHS},
    server::ServerConfig,
    LecternConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
