//! Main application configuration
//!
//! This module defines the configuration structures for the pairing-room
//! service, including environment variable and TOML file loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub engine: EngineSettings,
    pub rating: RatingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check endpoint
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// How often queue gauges are refreshed, in seconds
    pub metrics_interval_seconds: u64,
}

/// Execution engine client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Base URL of the execution engine
    pub url: String,
    /// Client-side timeout for one session creation call
    pub request_timeout_seconds: u64,
}

/// Rating workflow settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    /// Rating given to a model the first time it is rated
    pub initial_rating: i32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pairing-room".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
            metrics_interval_seconds: 15,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8081".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            initial_rating: 1200,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", key, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a TOML file; missing sections use defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from any key lookup, applying overrides on the defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Service settings
        if let Some(name) = lookup("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Some(port) = lookup("HEALTH_PORT") {
            config.service.health_port = parse_var("HEALTH_PORT", &port)?;
        }
        if let Some(timeout) = lookup("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds =
                parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }
        if let Some(interval) = lookup("METRICS_INTERVAL_SECONDS") {
            config.service.metrics_interval_seconds =
                parse_var("METRICS_INTERVAL_SECONDS", &interval)?;
        }

        // Engine settings
        if let Some(url) = lookup("ENGINE_URL") {
            config.engine.url = url;
        }
        if let Some(timeout) = lookup("ENGINE_REQUEST_TIMEOUT_SECONDS") {
            config.engine.request_timeout_seconds =
                parse_var("ENGINE_REQUEST_TIMEOUT_SECONDS", &timeout)?;
        }

        // Rating settings
        if let Some(initial) = lookup("INITIAL_RATING") {
            config.rating.initial_rating = parse_var("INITIAL_RATING", &initial)?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get metrics refresh interval as Duration
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.service.metrics_interval_seconds)
    }

    /// Get engine request timeout as Duration
    pub fn engine_request_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.request_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.trim().is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.metrics_interval_seconds == 0 {
        return Err(anyhow!("Metrics interval must be greater than 0"));
    }
    if config.engine.request_timeout_seconds == 0 {
        return Err(anyhow!("Engine request timeout must be greater than 0"));
    }

    // Validate engine settings
    let url = config.engine.url.trim();
    if url.is_empty() {
        return Err(anyhow!("Engine URL cannot be empty"));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(anyhow!("Engine URL must be http(s): {}", url));
    }

    if config.rating.initial_rating < crate::rating::RATING_FLOOR {
        return Err(anyhow!(
            "Initial rating {} is below the rating floor {}",
            config.rating.initial_rating,
            crate::rating::RATING_FLOOR
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        validate_config(&config).unwrap();
        assert_eq!(config.engine.url, "http://localhost:8081");
        assert_eq!(config.engine_request_timeout(), Duration::from_secs(10));
        assert_eq!(config.rating.initial_rating, 1200);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SERVICE_NAME", "pairing-test"),
            ("LOG_LEVEL", "debug"),
            ("HEALTH_PORT", "9191"),
            ("METRICS_INTERVAL_SECONDS", "5"),
            ("ENGINE_URL", "http://engine:9000"),
            ("ENGINE_REQUEST_TIMEOUT_SECONDS", "3"),
            ("INITIAL_RATING", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.service.name, "pairing-test");
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.service.health_port, 9191);
        assert_eq!(config.metrics_interval(), Duration::from_secs(5));
        assert_eq!(config.engine.url, "http://engine:9000");
        assert_eq!(config.engine_request_timeout(), Duration::from_secs(3));
        assert_eq!(config.rating.initial_rating, 1500);
    }

    #[test]
    fn test_unparseable_values_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("HEALTH_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("HEALTH_PORT"));

        assert!(AppConfig::from_lookup(lookup_from(&[("INITIAL_RATING", "1.5")])).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        for pairs in [
            [("LOG_LEVEL", "loud")],
            [("ENGINE_URL", "")],
            [("ENGINE_URL", "engine:8081")],
            [("ENGINE_REQUEST_TIMEOUT_SECONDS", "0")],
            [("HEALTH_PORT", "0")],
            [("INITIAL_RATING", "50")],
        ] {
            assert!(
                AppConfig::from_lookup(lookup_from(&pairs)).is_err(),
                "expected {:?} to be rejected",
                pairs
            );
        }
    }

    #[test]
    fn test_toml_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [engine]
            url = "https://engine.internal"

            [rating]
            initial_rating = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.url, "https://engine.internal");
        assert_eq!(config.engine.request_timeout_seconds, 10);
        assert_eq!(config.rating.initial_rating, 1000);
        assert_eq!(config.service, ServiceSettings::default());
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "pairing-room-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, "[service]\nhealth_port = 9300\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.service.health_port, 9300);
        assert!(AppConfig::from_file(&path).is_err());
    }
}
