//! Configuration module for traffic-guard
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`TRAFFIC_GUARD_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use traffic_guard::config::TrafficGuardConfig;
//!
//! let config = TrafficGuardConfig::default();
//! assert_eq!(config.backend.url, "http://localhost:8000");
//!
//! let toml = r#"
//! [backend]
//! url = "http://10.0.0.5:8000"
//! "#;
//! let config: TrafficGuardConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.backend.url, "http://10.0.0.5:8000");
//! ```

pub mod alerts;
pub mod backend;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod polling;

pub use alerts::{AlertConfig, AlertScope};
pub use backend::BackendConfig;
pub use dashboard::DashboardConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use polling::PollingConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the monitoring client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrafficGuardConfig {
    /// Backend address and request timeout
    pub backend: BackendConfig,
    /// Background polling intervals
    pub polling: PollingConfig,
    /// Spoken alert behaviour
    pub alerts: AlertConfig,
    /// Startup view and live source
    pub dashboard: DashboardConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl TrafficGuardConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("TRAFFIC_GUARD_BACKEND_URL") {
            self.backend.url = url;
        }

        if let Ok(level) = std::env::var("TRAFFIC_GUARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TRAFFIC_GUARD_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(voice) = std::env::var("TRAFFIC_GUARD_VOICE") {
            match voice.to_lowercase().as_str() {
                "true" | "on" | "1" => self.alerts.voice_enabled = true,
                "false" | "off" | "0" => self.alerts.voice_enabled = false,
                _ => {}
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.backend.url)
            .map_err(|e| ConfigError::invalid("backend.url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "backend.url",
                format!("scheme must be http or https, got '{}'", url.scheme()),
            ));
        }
        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "backend.timeout_seconds",
                "timeout must be non-zero",
            ));
        }

        if self.polling.logs_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "polling.logs_interval_ms",
                "interval must be non-zero",
            ));
        }
        if self.polling.analytics_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "polling.analytics_interval_ms",
                "interval must be non-zero",
            ));
        }

        if self.alerts.cooldown_seconds == 0 {
            return Err(ConfigError::invalid(
                "alerts.cooldown_seconds",
                "cool-down must be non-zero",
            ));
        }
        if !(self.alerts.speech_rate.is_finite() && self.alerts.speech_rate > 0.0) {
            return Err(ConfigError::invalid(
                "alerts.speech_rate",
                "rate must be a positive number",
            ));
        }
        if let Some(command) = &self.alerts.speech_command {
            if command.first().map_or(true, |p| p.is_empty()) {
                return Err(ConfigError::invalid(
                    "alerts.speech_command",
                    "command must name a program",
                ));
            }
        }

        if self.dashboard.default_source.is_empty() {
            return Err(ConfigError::invalid(
                "dashboard.default_source",
                "source cannot be empty",
            ));
        }

        Ok(())
    }
}
