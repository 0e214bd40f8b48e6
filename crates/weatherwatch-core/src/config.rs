use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::location::location_key;

const APP_DIR: &str = "weatherwatch";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Query surface
    #[serde(default)]
    pub server: ServerConfig,

    /// Ingestion schedule and tracked locations
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Geocoding and forecast endpoints
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Reading store backend
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Seconds between scheduler ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Display names of the locations to track, ingested in this order
    #[serde(default = "default_locations")]
    pub locations: Vec<String>,
}

/// Upper bound for `ingest.interval_secs`.
const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

fn default_interval_secs() -> u64 {
    60
}

fn default_locations() -> Vec<String> {
    vec!["moscow".to_string()]
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            locations: default_locations(),
        }
    }
}

impl IngestConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Open-Meteo geocoding search endpoint
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Open-Meteo forecast endpoint
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Client-level timeout for every upstream request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Language for geocoding results
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            timeout_secs: default_timeout_secs(),
            language: default_language(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which reading store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite database file (sqlite backend only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Database path for the sqlite backend, defaulting next to the config file.
    pub fn database_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| Config::config_dir().join("readings.db"))
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Uses `path` when given, the default location otherwise. Returns the
    /// config along with any validation warnings, or an error if validation
    /// fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.server.port == 0 {
            result.add_error("server.port", "Port cannot be 0");
        }
        if self.server.host.trim().is_empty() {
            result.add_error("server.host", "Host must not be empty");
        }

        // Ingestion schedule
        if self.ingest.interval_secs == 0 {
            result.add_error("ingest.interval_secs", "Interval must be greater than 0");
        } else if self.ingest.interval_secs > MAX_INTERVAL_SECS {
            result.add_error("ingest.interval_secs", "Interval cannot exceed 24 hours");
        } else if self.ingest.interval_secs < 10 {
            result.add_warning(
                "ingest.interval_secs",
                "Interval under 10 seconds may exceed upstream rate limits",
            );
        } else if self.ingest.interval_secs > 3600 {
            result.add_warning(
                "ingest.interval_secs",
                "Interval is more than an hour; readings will be stale",
            );
        }

        self.validate_locations(&mut result);

        // Upstream clients
        self.validate_url(&self.upstream.geocoding_url, "upstream.geocoding_url", &mut result);
        self.validate_url(&self.upstream.forecast_url, "upstream.forecast_url", &mut result);

        if self.upstream.timeout_secs == 0 {
            result.add_error("upstream.timeout_secs", "Timeout must be greater than 0");
        } else if self.ingest.interval_secs > 0
            && self.upstream.timeout_secs >= self.ingest.interval_secs
        {
            result.add_warning(
                "upstream.timeout_secs",
                "Timeout is not shorter than the ingest interval; slow upstreams will skip ticks",
            );
        }

        if self.upstream.language.trim().is_empty() {
            result.add_error("upstream.language", "Language must not be empty");
        }

        if self.storage.backend == StorageBackend::Memory && self.storage.path.is_some() {
            result.add_warning(
                "storage.path",
                "Path is ignored by the memory backend",
            );
        }

        result
    }

    fn validate_locations(&self, result: &mut ValidationResult) {
        if self.ingest.locations.is_empty() {
            result.add_error("ingest.locations", "At least one location is required");
            return;
        }

        let mut seen = HashSet::new();
        for name in &self.ingest.locations {
            let key = location_key(name);
            if key.is_empty() {
                result.add_error("ingest.locations", "Location names must not be blank");
            } else if !seen.insert(key.clone()) {
                result.add_error(
                    "ingest.locations",
                    format!("Duplicate location after normalization: {}", key),
                );
            }
        }
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory holding the config file and the default database
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Get the path to the default configuration file
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty(), "unexpected warnings: {:?}", result.warnings);
    }

    #[test]
    fn test_defaults_match_reference_service() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.ingest.interval(), Duration::from_secs(60));
        assert_eq!(config.upstream.timeout(), Duration::from_secs(10));
        assert_eq!(config.ingest.locations, vec!["moscow".to_string()]);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.upstream.geocoding_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "upstream.geocoding_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.upstream.forecast_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_empty_locations_is_error() {
        let mut config = Config::default();
        config.ingest.locations.clear();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "ingest.locations"));
    }

    #[test]
    fn test_duplicate_locations_after_normalization() {
        let mut config = Config::default();
        config.ingest.locations = vec!["Moscow".to_string(), " moscow ".to_string()];
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("Duplicate")));
    }

    #[test]
    fn test_zero_interval_is_error() {
        let mut config = Config::default();
        config.ingest.interval_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "ingest.interval_secs"));
    }

    #[test]
    fn test_interval_over_a_day_is_error() {
        let mut config = Config::default();
        config.ingest.interval_secs = 24 * 60 * 60 + 1;

        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "ingest.interval_secs"));
    }

    #[test]
    fn test_short_interval_is_warning() {
        let mut config = Config::default();
        config.ingest.interval_secs = 5;
        config.upstream.timeout_secs = 2;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "ingest.interval_secs"));
    }

    #[test]
    fn test_timeout_not_shorter_than_interval_is_warning() {
        let mut config = Config::default();
        config.ingest.interval_secs = 10;
        config.upstream.timeout_secs = 10;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "upstream.timeout_secs"));
    }

    #[test]
    fn test_zero_port_is_error() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "server.port"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ingest]
            locations = ["Moscow", "Paris"]

            [storage]
            backend = "sqlite"
            "#,
        )
        .unwrap();

        assert_eq!(config.ingest.locations.len(), 2);
        assert_eq!(config.ingest.interval_secs, 60);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.server.port = 8088;
        config.ingest.locations = vec!["Berlin".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server.port, 8088);
        assert_eq!(loaded.ingest.locations, vec!["Berlin".to_string()]);
    }

    #[test]
    fn test_load_from_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_validated_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ingest]\nlocations = []\n").unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = 1").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_bind_addr() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        assert_eq!(server.bind_addr(), "127.0.0.1:3000");
    }
}
