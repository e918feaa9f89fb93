#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Simlink Vectorized Environments
//!
//! Steps many environments in parallel, one worker thread each.
//!
//! -   **[`GymEnv`]:** the per-worker step interface; [`SessionEnv`] adapts any
//!     [`environment::Environment`].
//! -   **[`VectorizedExecutor`]:** the split `step_async`/`step_wait`
//!     protocol, ordered [`StepBatch`] results, periodic render broadcasts.
//!
//! Each worker owns its environment outright and talks to the executor over
//! a pair of `crossbeam` channels carrying a fixed command set.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vecenv::{ExecutorConfig, SessionEnv, VectorizedExecutor};
//!
//! let mut executor = VectorizedExecutor::new(factories, ExecutorConfig::new(50)?)?;
//! executor.reset()?;
//! executor.step_async(actions)?;
//! // ... other work ...
//! let batch = executor.step_wait()?.into_arrays()?;
//! executor.close();
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod worker;

pub use config::{ExecutorConfig, DEFAULT_RENDER_INTERVAL};
pub use env::{EnvFactory, GymEnv, SessionEnv, StepInfo, Transition};
pub use error::{VecEnvError, WorkerFailure};
pub use executor::{StepArrays, StepBatch, VectorizedExecutor};
pub use worker::WorkerHandle;
