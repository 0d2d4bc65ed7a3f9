//! Request-security pipeline configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_request_path, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Paths served without authentication. Matching is exact, never by prefix.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/api/auth/mode",
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/refresh",
    "/api/auth/forgot-password",
    "/api/auth/reset-password",
    "/api/health",
    // Legacy login alias kept for older clients
    "/api/login",
];

/// Security pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC secret for bearer tokens. Requests needing authentication are
    /// answered with 500 while this is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    /// Expected `iss` claim, checked only when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_issuer: Option<String>,

    /// Expected `aud` claim, checked only when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_audience: Option<String>,

    /// Lifetime of issued tokens
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_token_expiration")]
    pub token_expiration: Duration,

    /// Exact-match allow-list of unauthenticated paths
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// How tenant scoping reacts when the store cannot answer
    #[serde(default)]
    pub scope_enforcement: ScopeEnforcement,

    /// Audit trail configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Take the client address from `CF-Connecting-IP` / `X-Forwarded-For`.
    /// Turn off when the server is not behind a proxy that sets them.
    #[serde(default = "crate::domains::utils::default_true")]
    pub trust_proxy_headers: bool,
}

/// Fixed-window rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    #[serde(default = "crate::domains::utils::default_true")]
    pub enabled: bool,

    /// Requests allowed per identity within one window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_window")]
    pub window: Duration,

    /// Upper bound on tracked identities; least recently seen are evicted
    #[serde(default = "default_max_tracked_identities")]
    pub max_tracked_identities: usize,

    /// Requests allowed per client address on public paths within one window
    #[serde(default = "default_public_max_requests")]
    pub public_max_requests: u32,
}

/// Two-phase switch for tenant scoping during schema rollout.
///
/// `Permissive` lets requests through (with a warning) when the organization
/// or resource tables cannot be queried; `Strict` rejects them with 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScopeEnforcement {
    #[default]
    Permissive,
    Strict,
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Record successful mutating requests
    #[serde(default = "crate::domains::utils::default_true")]
    pub enabled: bool,
}

impl SecurityConfig {
    /// Whether `path` is on the public allow-list
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|public| public == path)
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_issuer: None,
            jwt_audience: None,
            token_expiration: default_token_expiration(),
            public_paths: default_public_paths(),
            rate_limit: RateLimitConfig::default(),
            scope_enforcement: ScopeEnforcement::default(),
            audit: AuditConfig::default(),
            trust_proxy_headers: true,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window: default_window(),
            max_tracked_identities: default_max_tracked_identities(),
            public_max_requests: default_public_max_requests(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl fmt::Display for ScopeEnforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeEnforcement::Permissive => f.write_str("permissive"),
            ScopeEnforcement::Strict => f.write_str("strict"),
        }
    }
}

impl FromStr for ScopeEnforcement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(ScopeEnforcement::Permissive),
            "strict" => Ok(ScopeEnforcement::Strict),
            _ => Err(format!("Invalid scope enforcement: {}", s)),
        }
    }
}

impl Validatable for SecurityConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(ref secret) = self.jwt_secret {
            validate_required_string(secret, "jwt_secret", self.domain_name())?;
        }
        if let Some(ref issuer) = self.jwt_issuer {
            validate_required_string(issuer, "jwt_issuer", self.domain_name())?;
        }
        if let Some(ref audience) = self.jwt_audience {
            validate_required_string(audience, "jwt_audience", self.domain_name())?;
        }

        validate_positive(self.token_expiration.as_secs(), "token_expiration", self.domain_name())?;

        for path in &self.public_paths {
            validate_request_path(path, "public_paths", self.domain_name())?;
        }

        self.rate_limit.validate()?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "security"
    }
}

impl Validatable for RateLimitConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled {
            validate_positive(self.max_requests, "max_requests", self.domain_name())?;
            validate_positive(self.window.as_secs(), "window", self.domain_name())?;
            validate_positive(self.max_tracked_identities, "max_tracked_identities", self.domain_name())?;
            validate_positive(self.public_max_requests, "public_max_requests", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "security.rate_limit"
    }
}

fn default_token_expiration() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_public_paths() -> Vec<String> {
    DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect()
}

fn default_max_requests() -> u32 {
    100
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

fn default_max_tracked_identities() -> usize {
    10_000
}

fn default_public_max_requests() -> u32 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_path_matching_is_exact() {
        let config = SecurityConfig::default();
        assert!(config.is_public_path("/api/auth/login"));
        assert!(config.is_public_path("/api/login"));
        assert!(!config.is_public_path("/api/auth/login/extra"));
        assert!(!config.is_public_path("/api/auth"));
        assert!(!config.is_public_path("/api/health/"));
    }

    #[test]
    fn test_missing_secret_is_not_a_validation_error() {
        let config = SecurityConfig::default();
        assert!(config.jwt_secret.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_secret_is_rejected() {
        let config = SecurityConfig {
            jwt_secret: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_rate_limit_skips_bounds() {
        let config = RateLimitConfig {
            enabled: false,
            max_requests: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let enabled = RateLimitConfig {
            max_requests: 0,
            ..Default::default()
        };
        assert!(enabled.validate().is_err());
    }

    #[test]
    fn test_proxy_headers_trusted_unless_disabled() {
        assert!(SecurityConfig::default().trust_proxy_headers);

        let config: SecurityConfig = serde_yaml::from_str("trust_proxy_headers: false").unwrap();
        assert!(!config.trust_proxy_headers);
    }

    #[test]
    fn test_scope_enforcement_parsing() {
        assert_eq!("STRICT".parse::<ScopeEnforcement>().unwrap(), ScopeEnforcement::Strict);
        assert_eq!(ScopeEnforcement::default(), ScopeEnforcement::Permissive);
        assert!("off".parse::<ScopeEnforcement>().is_err());
    }
}
