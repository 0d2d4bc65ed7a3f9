//! Configuration validation traits and utilities

use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate a database URL
pub fn validate_url(url: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    validate_required_string(url, field_name, domain)?;

    url::Url::parse(url).map_err(|e| ConfigError::DomainError {
        domain: domain.to_string(),
        message: format!("{} has invalid URL format: {}", field_name, e),
    })?;

    Ok(())
}

/// Validate an absolute request path (`/api/...`)
pub fn validate_request_path(path: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if !path.starts_with('/') || path.chars().any(char::is_whitespace) {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} entry '{}' must be an absolute path without whitespace", field_name, path),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(5u32, "max", "test").is_ok());
        assert!(validate_positive(0u32, "max", "test").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("sqlite://lectern.db?mode=rwc", "url", "database").is_ok());
        assert!(validate_url("", "url", "database").is_err());
        assert!(validate_url("not a url", "url", "database").is_err());
    }

    #[test]
    fn test_validate_request_path() {
        assert!(validate_request_path("/api/health", "public_paths", "security").is_ok());
        assert!(validate_request_path("api/health", "public_paths", "security").is_err());
        assert!(validate_request_path("/api/ health", "public_paths", "security").is_err());
    }
}
