#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Simlink Connection
//!
//! One logical connection to one simulator endpoint: framing, the transport
//! seam, the connect/handshake/close lifecycle and its listeners.
//!
//! The entry point is [`ConnectionManager`]. It is configured with a
//! [`ConnectionConfig`], opens transports through a [`Connector`] (TCP by
//! default) and uses a [`messaging::MessageCodec`] for the handshake probes.

pub mod config;
pub mod events;
pub mod frame;
pub mod manager;
pub mod transport;

pub use config::{ConnectionConfig, Endpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use events::{ConnectionEvent, Listener, Listeners};
pub use manager::{ConnectionError, ConnectionManager, ConnectionState};
pub use transport::{Connector, TcpConnector, TcpTransport, Transport, TransportError};
