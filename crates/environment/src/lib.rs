#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Simlink Environment
//!
//! Client-side sessions with a remote simulator.
//!
//! -   **[`ReactionExchange`]:** one synchronous request/response cycle.
//! -   **[`EnvironmentSession`]:** the stateful session; tracks the latest
//!     states, the description and the [`messaging::Spaces`] derived from it.
//! -   **[`Environment`]:** the capability trait sessions implement, with
//!     [`StateStream`] as its explicit iterator form.
//! -   **[`local`]:** in-process simulators ([`RollingSphere`]) reachable
//!     through a [`LoopbackConnector`], and [`SimulatorServer`] to expose one
//!     over TCP.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use connection::ConnectionConfig;
//! use environment::{Environment, EnvironmentSession, ResetRequest};
//!
//! let mut session = EnvironmentSession::tcp(ConnectionConfig::default());
//! session.reset(ResetRequest::new())?;
//! let action = session.spaces().unwrap().action.sample();
//! let state = session.react(action.into())?;
//! ```

pub mod environment;
pub mod error;
pub mod exchange;
pub mod local;
pub mod server;
pub mod session;

pub use environment::{Environment, ReactInput, ResetRequest, StateStream};
pub use error::EnvironmentError;
pub use exchange::ReactionExchange;
pub use local::{LocalSimulator, LoopbackConnector, LoopbackTransport, RollingSphere};
pub use server::SimulatorServer;
pub use session::{EnvironmentSession, SessionState};
