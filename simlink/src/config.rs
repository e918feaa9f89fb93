//! Configuration file loading.

use anyhow::{Context, Result};
use connection::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vecenv::ExecutorConfig;

/// Everything a `simlink` command can be configured with.
///
/// ```json
/// {
///   "connection": { "endpoint": { "host": "10.0.0.2", "port": 6969 }, "max_connect_attempts": 20 },
///   "executor": { "render_interval": 50 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub executor: ExecutorConfig,
}

impl AppConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Malformed JSON or an invalid connection or executor section.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json).context("parsing config")?;
        config.connection.validate()?;
        config.executor.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Unreadable file, malformed JSON or invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("loading {}", path.display()))
    }

    /// Apply command line overrides on top of the file values.
    #[must_use]
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>, render_interval: Option<u32>) -> Self {
        if let Some(host) = host {
            self.connection.endpoint.host = host;
        }
        if let Some(port) = port {
            self.connection.endpoint.port = port;
        }
        if let Some(render_interval) = render_interval {
            self.executor.render_interval = render_interval;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_json(r#"{ "connection": { "endpoint": { "port": 7000 } } }"#).unwrap();
        assert_eq!(config.connection.endpoint.port, 7000);
        assert_eq!(config.connection.endpoint.host, connection::DEFAULT_HOST);
        assert_eq!(config.connection.max_connect_attempts, 100);
        assert_eq!(config.executor, ExecutorConfig::default());
    }

    #[test]
    fn zero_render_interval_is_rejected() {
        assert!(AppConfig::from_json(r#"{ "executor": { "render_interval": 0 } }"#).is_err());
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let err = AppConfig::from_json(r#"{ "connection": { "request_timeout_ms": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("request_timeout_ms"), "got {err:#}");
    }

    #[test]
    fn flags_override_file_values() {
        let config = AppConfig::default().with_overrides(Some("10.1.1.1".into()), None, Some(7));
        assert_eq!(config.connection.endpoint.host, "10.1.1.1");
        assert_eq!(config.connection.endpoint.port, connection::DEFAULT_PORT);
        assert_eq!(config.executor.render_interval, 7);
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/simlink.json"))).is_err());
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
