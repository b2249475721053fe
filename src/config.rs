//! Configuration management for Archer Fetcher
//!
//! This module provides file-based configuration with multi-location search
//! and zero-config defaults. The `[cache]` and `[retrieval]` tables map
//! directly onto their runtime configs and accept humantime durations
//! (`"30m"`, `"250ms"`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, ClientConfig, RetrievalConfig, ServiceConfig};
use crate::constants::{http, limits, logging};
use crate::errors::{AppError, ConfigError, Result};

/// File name searched for in the working directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "archer-fetcher.toml";

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Metadata cache settings
    pub cache: CacheConfig,
    /// Record retrieval settings
    pub retrieval: RetrievalConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum connections per host
    pub pool_max_per_host: usize,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Accept self-signed certificates
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            tcp_keepalive_secs: Some(30),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the cache or retrieval
    /// settings are out of range
    pub fn to_runtime_config(&self) -> Result<(ClientConfig, ServiceConfig)> {
        self.cache.validate()?;
        self.retrieval.validate()?;
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            }
            .into());
        }

        Ok((
            self.client.to_runtime_config(),
            ServiceConfig {
                cache: self.cache.clone(),
                retrieval: self.retrieval.clone(),
            },
        ))
    }

    /// Load configuration from the first file found, or defaults
    ///
    /// An explicitly given file must exist.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write a commented default config file unless one exists
    pub async fn write_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::generic(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to write config file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        info!("Wrote default configuration to {}", path.display());
        Ok(true)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(CONFIG_FILE_NAME)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("archer-fetcher").join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# Archer Fetcher Configuration

[client]
tcp_keepalive_secs = 30
tcp_nodelay = true
pool_idle_timeout_secs = {pool_idle}
pool_max_per_host = {pool_max}
request_timeout_secs = {request_timeout}
connect_timeout_secs = {connect_timeout}
rate_limit_rps = {rps}
# Set for on-premise instances with self-signed certificates
accept_invalid_certs = false

[cache]
# How long application metadata stays authoritative
application_cache_ttl = "30m"
# How long alias/display-name mappings are kept
field_cache_ttl = "15m"
max_application_cache_entries = 50
# Fraction of the TTL after which reads refresh in the background
auto_refresh_threshold = 0.8
# Records sampled to infer fields for levels without definitions
sample_record_limit = 5
# Entries cached without any field metadata are retried after this
degraded_entry_ttl = "1m"

[retrieval]
batch_size = 1000
reduced_batch_size = 500
min_retry_batch_size = 100
time_budget = "25s"
batch_pause = "100ms"
# 0 disables the pause
pause_every_batches = 5
all_records_top = 10000
page_sample_size = 1000
extended_sample_size = 10000
min_approximate_total = 100

[logging]
level = "{level}"  # error, warn, info, debug, trace
"#,
            pool_idle = http::POOL_IDLE_TIMEOUT.as_secs(),
            pool_max = http::POOL_MAX_PER_HOST,
            request_timeout = http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout = http::CONNECT_TIMEOUT.as_secs(),
            rps = limits::DEFAULT_RATE_LIMIT_RPS,
            level = logging::DEFAULT_LOG_LEVEL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_creation() {
        let config = AppConfig::default();

        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.client.request_timeout_secs, 120);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_config_file_generation() {
        let content = AppConfig::generate_default_config_content();

        // Should be valid TOML matching the defaults
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.cache, CacheConfig::default());
        assert_eq!(parsed.retrieval, RetrievalConfig::default());
        assert_eq!(parsed.client.pool_max_per_host, http::POOL_MAX_PER_HOST);
        assert!(content.contains("[retrieval]"));
    }

    #[test]
    fn test_runtime_conversion_validates() {
        let (client, service) = AppConfig::default().to_runtime_config().unwrap();
        assert_eq!(client.request_timeout, Duration::from_secs(120));
        assert_eq!(service.cache.max_application_cache_entries, 50);

        let mut config = AppConfig::default();
        config.cache.auto_refresh_threshold = 1.5;
        assert!(matches!(
            config.to_runtime_config(),
            Err(AppError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(AppError::Config(ConfigError::NotFound { .. }))));
    }

    #[tokio::test]
    async fn test_partial_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("archer.toml");
        tokio::fs::write(
            &config_path,
            r#"
[cache]
application_cache_ttl = "10m"

[retrieval]
batch_size = 200

[logging]
level = "debug"
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load(Some(config_path)).await.unwrap();
        assert_eq!(config.cache.application_cache_ttl, Duration::from_secs(600));
        assert_eq!(config.cache.max_application_cache_entries, 50);
        assert_eq!(config.retrieval.batch_size, 200);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        tokio::fs::write(&config_path, "[cache\n").await.unwrap();

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(AppError::Config(ConfigError::InvalidFormat(_)))));
    }

    #[tokio::test]
    async fn test_write_default_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

        assert!(AppConfig::write_default(&path).await.unwrap());
        assert!(!AppConfig::write_default(&path).await.unwrap());
        assert!(AppConfig::load(Some(path)).await.is_ok());
    }
}
