//! # Connection Lifecycle
//!
//! [`ConnectionManager`] owns the single logical connection to one simulator
//! endpoint:
//!
//! ```text
//! Disconnected --connect--> Connecting --handshake ok--> Connected
//!                                |                          |
//!                                +--attempts exhausted--> TimedOut
//!                                +--undecodable answer--> Disconnected
//! any --close--> Disconnected        Connected --remote drop--> Disconnected
//! ```
//!
//! The handshake repeatedly sends a zero-effect describe reaction at a fixed
//! interval until a state carrying a non-empty description comes back.
//!
//! Every method takes `&mut self`, so at most one request can be in flight on
//! a manager at any time.

use crate::config::{ConnectionConfig, Endpoint};
use crate::events::{ConnectionEvent, Listeners};
use crate::transport::{Connector, TcpConnector, Transport, TransportError};
use messaging::{DecodeError, EncodeError, JsonCodec, MessageCodec, Reaction, Response};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    TimedOut,
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("no description from {endpoint} after {attempts} connection attempts")]
    Timeout { endpoint: Endpoint, attempts: u32 },
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),
    #[error("connection is {0:?}, not connected")]
    NotConnected(ConnectionState),
    #[error("{0} dropped the connection")]
    Disconnected(Endpoint),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("undecodable handshake response: {0}")]
    Decode(#[from] DecodeError),
    #[error("invalid connection config: {0}")]
    InvalidConfig(String),
}

/// Owns the transport to one simulator and drives its lifecycle.
pub struct ConnectionManager {
    config: ConnectionConfig,
    connector: Box<dyn Connector>,
    codec: Arc<dyn MessageCodec>,
    transport: Option<Box<dyn Transport>>,
    state: ConnectionState,
    listeners: Listeners,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(config: ConnectionConfig, connector: Box<dyn Connector>, codec: Arc<dyn MessageCodec>) -> Self {
        Self {
            config,
            connector,
            codec,
            transport: None,
            state: ConnectionState::Disconnected,
            listeners: Listeners::default(),
        }
    }

    /// TCP transport with the JSON codec.
    #[must_use]
    pub fn tcp(config: ConnectionConfig) -> Self {
        Self::new(config, Box::new(TcpConnector), Arc::new(JsonCodec))
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    #[must_use]
    pub fn codec(&self) -> &Arc<dyn MessageCodec> {
        &self.codec
    }

    /// Register the callback for `event`, replacing any previous one.
    pub fn on_event(&mut self, event: ConnectionEvent, listener: impl FnMut() + Send + 'static) {
        self.listeners.set(event, Box::new(listener));
    }

    /// Point the manager at `endpoint` and run the handshake.
    ///
    /// # Errors
    ///
    /// See [`ConnectionManager::connect`].
    pub fn connect_to(&mut self, endpoint: Endpoint) -> Result<Response, ConnectionError> {
        self.config.endpoint = endpoint;
        self.connect()
    }

    /// Open the transport and confirm the simulator with describe probes.
    ///
    /// Returns the response that confirmed the connection, so callers can
    /// seed their state without another exchange. A transport that fails to
    /// open, a probe that times out or a response without a description each
    /// use up one attempt. Connecting again from `TimedOut` starts with a
    /// fresh attempt budget.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::InvalidConfig`] before anything is sent.
    /// - [`ConnectionError::Decode`] as soon as a probe response cannot be
    ///   decoded; the transport is closed and the manager is `Disconnected`.
    /// - [`ConnectionError::Timeout`] once `max_connect_attempts` probes went
    ///   unanswered; the manager is then in [`ConnectionState::TimedOut`].
    pub fn connect(&mut self) -> Result<Response, ConnectionError> {
        self.config.validate()?;
        if let Some(mut transport) = self.transport.take() {
            debug!(endpoint = %self.config.endpoint, "reconnecting; dropping previous transport");
            transport.close();
        }
        self.state = ConnectionState::Connecting;
        info!(endpoint = %self.config.endpoint, "connecting to simulator");

        let probe = self.codec.encode_reactions(&[Reaction::describe()])?;
        let attempts = self.config.max_connect_attempts;
        for attempt in 1..=attempts {
            let answered = match self.probe(&probe, attempt) {
                Ok(answered) => answered,
                Err(e) => {
                    self.drop_transport();
                    self.state = ConnectionState::Disconnected;
                    warn!(endpoint = %self.config.endpoint, attempt, error = %e, "handshake aborted");
                    return Err(e.into());
                }
            };
            if let Some(response) = answered {
                self.state = ConnectionState::Connected;
                info!(endpoint = %self.config.endpoint, attempt, "simulator connected");
                self.listeners.emit(ConnectionEvent::Connected);
                return Ok(response);
            }
            if attempt < attempts {
                thread::sleep(self.config.retry_interval());
            }
        }

        self.drop_transport();
        self.state = ConnectionState::TimedOut;
        warn!(endpoint = %self.config.endpoint, attempts, "simulator did not describe itself in time");
        self.listeners.emit(ConnectionEvent::Timeout);
        Err(ConnectionError::Timeout { endpoint: self.config.endpoint.clone(), attempts })
    }

    fn drop_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }

    /// One handshake attempt; `Some` when it produced a description. A
    /// response in the wrong protocol is never retried.
    fn probe(&mut self, probe: &[u8], attempt: u32) -> Result<Option<Response>, DecodeError> {
        if self.transport.is_none() {
            match self.connector.open(&self.config.endpoint, self.config.connect_timeout()) {
                Ok(transport) => self.transport = Some(transport),
                Err(e) => {
                    debug!(attempt, error = %e, "transport not available yet");
                    return Ok(None);
                }
            }
        }
        let Some(transport) = self.transport.as_mut() else {
            return Ok(None);
        };
        let payload = match transport.request(probe, self.config.request_timeout()) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(attempt, error = %e, "probe failed");
                if !e.is_transient() {
                    transport.close();
                    self.transport = None;
                }
                return Ok(None);
            }
        };
        if payload.is_empty() {
            debug!(attempt, "probe answered with no update");
            return Ok(None);
        }
        let response = self.codec.decode_response(&payload)?;
        if response.states.values().any(|s| s.non_empty_description().is_some()) {
            return Ok(Some(response));
        }
        debug!(attempt, "simulator has not described itself yet");
        Ok(None)
    }

    /// Send one request payload and wait for its response.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::NotConnected`] outside `Connected`.
    /// - [`ConnectionError::RequestTimeout`] when no response arrived within
    ///   the request timeout; the connection stays `Connected` so the caller
    ///   may retry.
    /// - [`ConnectionError::Disconnected`] when the remote went away or the
    ///   request could not be written in full; the manager reverts to
    ///   `Disconnected` and notifies its listener.
    pub fn send(&mut self, payload: &[u8]) -> Result<Vec<u8>, ConnectionError> {
        if self.state != ConnectionState::Connected {
            return Err(ConnectionError::NotConnected(self.state));
        }
        let timeout = self.config.request_timeout();
        let Some(transport) = self.transport.as_mut() else {
            return Err(ConnectionError::NotConnected(self.state));
        };
        match transport.request(payload, timeout) {
            Ok(response) => Ok(response),
            Err(TransportError::Timeout(elapsed)) => {
                warn!(endpoint = %self.config.endpoint, ?elapsed, "request timed out");
                Err(ConnectionError::RequestTimeout(elapsed))
            }
            Err(e) => {
                transport.close();
                self.transport = None;
                self.state = ConnectionState::Disconnected;
                warn!(endpoint = %self.config.endpoint, error = %e, "simulator disconnected");
                self.listeners.emit(ConnectionEvent::Disconnected);
                Err(ConnectionError::Disconnected(self.config.endpoint.clone()))
            }
        }
    }

    /// Release the transport. Valid from any state; idempotent.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            debug!(endpoint = %self.config.endpoint, "connection closed");
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
