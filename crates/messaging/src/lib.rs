#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Simlink Messaging
//!
//! The data model exchanged with a remote simulator and the codec that puts
//! it on the wire.
//!
//! -   **[`Reaction`]:** one outbound command (motions, configurations,
//!     unobservable state to restore) plus its [`ReactionParameters`].
//! -   **[`State`]:** one inbound snapshot of a named environment.
//! -   **[`Description`]:** the static layout of an environment, from which
//!     the [`Spaces`] are derived.
//! -   **[`MessageCodec`]:** the encode/decode contract, with [`JsonCodec`] as
//!     the bundled implementation.

pub mod codec;
pub mod description;
pub mod reaction;
pub mod space;
pub mod state;

pub use codec::{DecodeError, EncodeError, JsonCodec, MessageCodec, SCHEMA_VERSION};
pub use description::{Actor, Configurable, Description, Motor, ObserverDescription};
pub use reaction::{Body, Configuration, Motion, Reaction, ReactionParameters, Unobservables};
pub use space::{ActionDimension, ActionSpace, ObservationSpace, SignalSpace, Space, Spaces};
pub use state::{Response, SimulatorConfiguration, State};
