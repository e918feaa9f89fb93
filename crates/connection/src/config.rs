//! Connection settings.
//!
//! Retry and timeout values live here instead of in process-wide constants so
//! every session can be tuned on its own.

use crate::manager::ConnectionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6969;

/// Host and port of a simulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Settings for one [`crate::ConnectionManager`].
///
/// Durations are stored in milliseconds so config files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub endpoint: Endpoint,
    /// Handshake probes sent before giving up with a timeout.
    pub max_connect_attempts: u32,
    /// Pause between two handshake probes.
    pub retry_interval_ms: u64,
    /// Bound on a single request/response exchange.
    pub request_timeout_ms: u64,
    /// Bound on opening the transport.
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            max_connect_attempts: 100,
            retry_interval_ms: 100,
            request_timeout_ms: 10_000,
            connect_timeout_ms: 1_000,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl ConnectionConfig {
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_max_connect_attempts(mut self, attempts: u32) -> Self {
        self.max_connect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = millis(interval);
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = millis(timeout);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = millis(timeout);
        self
    }

    /// # Errors
    ///
    /// [`ConnectionError::InvalidConfig`] when there are no connect attempts
    /// or a timeout is zero.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        let invalid = |reason: &str| Err(ConnectionError::InvalidConfig(reason.to_owned()));
        if self.max_connect_attempts == 0 {
            return invalid("max_connect_attempts must be positive");
        }
        if self.request_timeout_ms == 0 {
            return invalid("request_timeout_ms must be positive");
        }
        if self.connect_timeout_ms == 0 {
            return invalid("connect_timeout_ms must be positive");
        }
        Ok(())
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_loopback() {
        let config = ConnectionConfig::default();
        assert_eq!(config.endpoint.to_string(), "127.0.0.1:6969");
        assert_eq!(config.max_connect_attempts, 100);
        assert_eq!(config.retry_interval(), Duration::from_millis(100));
    }

    #[test]
    fn builders_convert_durations() {
        let config = ConnectionConfig::default()
            .with_retry_interval(Duration::from_secs(2))
            .with_request_timeout(Duration::from_millis(250));
        assert_eq!(config.retry_interval_ms, 2_000);
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn zero_timeouts_and_attempts_are_rejected() {
        assert!(ConnectionConfig::default().validate().is_ok());
        for config in [
            ConnectionConfig::default().with_request_timeout(Duration::ZERO),
            ConnectionConfig::default().with_connect_timeout(Duration::ZERO),
            ConnectionConfig::default().with_max_connect_attempts(0),
        ] {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ConnectionError::InvalidConfig(_)), "got {err:?}");
        }
    }
}
