//! Configuration management for the warden server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use warden_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("warden.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use warden_domain::checker::CheckerConfig;
use warden_domain::identity::TokenPrefixes;

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Access checker settings
    #[serde(default)]
    pub checker: CheckerSettings,

    /// Credential classification settings
    #[serde(default)]
    pub identity: IdentitySettings,

    /// Trust center defaults
    #[serde(default)]
    pub trust_center: TrustCenterDefaults,
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type. Only "memory" ships with this crate.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Maximum tuples written or deleted by one transaction.
    #[serde(default = "default_max_tuples_per_write")]
    pub max_tuples_per_write: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            max_tuples_per_write: default_max_tuples_per_write(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

fn default_max_tuples_per_write() -> usize {
    warden_storage::DEFAULT_MAX_TUPLES_PER_WRITE
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Access checker settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CheckerSettings {
    /// Maximum linked-resource hops per check.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Check timeout in milliseconds. Timed-out checks deny.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl CheckerSettings {
    pub fn to_checker_config(&self) -> CheckerConfig {
        CheckerConfig::default()
            .with_max_depth(self.max_depth)
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

fn default_max_depth() -> u32 {
    25
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Credential classification settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IdentitySettings {
    /// Bearer-token prefix of service API tokens.
    #[serde(default = "default_api_token_prefix")]
    pub api_token_prefix: String,

    /// Bearer-token prefix of personal access tokens.
    #[serde(default = "default_pat_prefix")]
    pub personal_access_token_prefix: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            api_token_prefix: default_api_token_prefix(),
            personal_access_token_prefix: default_pat_prefix(),
        }
    }
}

impl IdentitySettings {
    pub fn token_prefixes(&self) -> TokenPrefixes {
        TokenPrefixes {
            api_token: self.api_token_prefix.clone(),
            personal_access_token: self.personal_access_token_prefix.clone(),
        }
    }
}

fn default_api_token_prefix() -> String {
    TokenPrefixes::default().api_token
}

fn default_pat_prefix() -> String {
    TokenPrefixes::default().personal_access_token
}

/// Trust center defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TrustCenterDefaults {
    /// Watermarking for documents of trust centers without their own setting.
    #[serde(default)]
    pub watermarking_default: bool,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

fn environment() -> Environment {
    // WARDEN_CHECKER__MAX_DEPTH -> checker.max_depth
    Environment::with_prefix("WARDEN")
        .prefix_separator("_")
        .separator("__")
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `WARDEN_` and use `__` as separator.
    /// For example:
    /// - `WARDEN_LOGGING__LEVEL=debug` overrides `logging.level`
    /// - `WARDEN_CHECKER__TIMEOUT_MS=250` overrides `checker.timeout_ms`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(environment())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        fn invalid(message: String) -> Result<(), ConfigLoadError> {
            Err(ConfigLoadError::Invalid { message })
        }

        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return invalid(format!(
                "storage.backend must be one of: {:?}, got: {}",
                valid_backends, self.storage.backend
            ));
        }
        if self.storage.max_tuples_per_write == 0 {
            return invalid("storage.max_tuples_per_write must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            ));
        }

        if self.checker.max_depth == 0 {
            return invalid("checker.max_depth must be greater than 0".to_string());
        }
        if self.checker.timeout_ms == 0 {
            return invalid("checker.timeout_ms must be greater than 0".to_string());
        }

        let api = self.identity.api_token_prefix.trim();
        let pat = self.identity.personal_access_token_prefix.trim();
        if api.is_empty() || pat.is_empty() {
            return invalid("identity token prefixes cannot be empty".to_string());
        }
        if api == pat || api.starts_with(pat) || pat.starts_with(api) {
            return invalid(format!(
                "identity token prefixes must be distinct, got: {api} and {pat}"
            ));
        }

        Ok(())
    }
}
