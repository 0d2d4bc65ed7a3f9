//! Configuration loading and environment variable handling

use crate::domains::LecternConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "LECTERN".to_string(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<LecternConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: LecternConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<LecternConfig> {
        let mut config = LecternConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load from `config_path` when given, otherwise from the environment
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<LecternConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut LecternConfig) -> ConfigResult<()> {
        self.apply_server_overrides(config)?;
        self.apply_database_overrides(config)?;
        self.apply_logging_overrides(config)?;
        self.apply_security_overrides(config)?;
        Ok(())
    }

    fn apply_server_overrides(&self, config: &mut LecternConfig) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.server.bind_address = bind;
        }

        if let Some(port) = self.parse_env_var::<u16>("SERVER_PORT")? {
            config.server.port = port;
        }

        Ok(())
    }

    fn apply_database_overrides(&self, config: &mut LecternConfig) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("DATABASE_URL") {
            config.database.url = url;
        }

        if let Some(run) = self.parse_env_var::<bool>("DATABASE_RUN_MIGRATIONS")? {
            config.database.run_migrations = run;
        }

        Ok(())
    }

    fn apply_logging_overrides(&self, config: &mut LecternConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.logging.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.logging.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn apply_security_overrides(&self, config: &mut LecternConfig) -> ConfigResult<()> {
        let security = &mut config.security;

        if let Ok(secret) = self.get_env_var("JWT_SECRET") {
            security.jwt_secret = Some(secret);
        }

        if let Some(max) = self.parse_env_var::<u32>("RATE_LIMIT_MAX_REQUESTS")? {
            security.rate_limit.max_requests = max;
        }

        if let Some(seconds) = self.parse_env_var::<u64>("RATE_LIMIT_WINDOW_SECONDS")? {
            security.rate_limit.window = Duration::from_secs(seconds);
        }

        if let Some(enabled) = self.parse_env_var::<bool>("RATE_LIMIT_ENABLED")? {
            security.rate_limit.enabled = enabled;
        }

        if let Ok(mode) = self.get_env_var("SCOPE_ENFORCEMENT") {
            security.scope_enforcement = mode.parse().map_err(ConfigError::EnvError)?;
        }

        if let Some(enabled) = self.parse_env_var::<bool>("AUDIT_ENABLED")? {
            security.audit.enabled = enabled;
        }

        if let Some(trust) = self.parse_env_var::<bool>("TRUST_PROXY_HEADERS")? {
            security.trust_proxy_headers = trust;
        }

        Ok(())
    }

    /// Parse an optional environment variable, failing on malformed values
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}_{}: {}", self.prefix, name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
