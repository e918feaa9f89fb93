#![deny(clippy::all, clippy::pedantic)]
//! # Simlink: a client runtime for remote simulators
//!
//! ## Overview
//!
//! Simlink drives simulators that live in another process, typically a game
//! engine scene, over a small request/response protocol. A client sends
//! batches of *reactions* (motions, configurations, control flags) and the
//! simulator answers with the *state* of every environment it hosts: the
//! observables, a reward-like signal, termination and, on request, a
//! description of its actors, motors and observers.
//!
//! ## Project Architecture
//!
//! -   **`simlink`:** The crate you are currently viewing. It is the entry
//!     point for the documentation and the `simlink` binary, which can host a
//!     toy simulator, drive a single session against a simulator, or step a
//!     pool of environments in parallel.
//! -   **[`messaging`]:** The data model (reactions, states, descriptions and
//!     spaces) and the versioned codec that puts it on the wire.
//! -   **[`connection`]:** Length-prefixed framing, the TCP transport and the
//!     `ConnectionManager`, which runs the describe-probe handshake and guards
//!     every exchange with a timeout.
//! -   **[`environment`]:** `EnvironmentSession`, the stateful handle to one
//!     simulator, with lazily connecting resets, action inference from the
//!     description and spaces rebuilt on every new description. Also home of
//!     the in-process `RollingSphere` simulator and the TCP simulator server.
//! -   **[`vecenv`]:** The `VectorizedExecutor`, which runs one environment
//!     per worker thread behind a split `step_async`/`step_wait` protocol.
//!
//! ## Getting Started
//!
//! ```text
//! simlink serve --port 6969 &
//! simlink run --port 6969 --steps 1000
//! simlink vec --envs 8 --steps 500 --render-interval 50
//! ```
//!
//! All commands accept `--config FILE`, a JSON document with optional
//! `connection` and `executor` sections; see [`config::AppConfig`].

pub mod config;

pub use connection;
pub use environment;
pub use messaging;
pub use vecenv;
