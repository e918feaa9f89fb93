//! # Step Interface
//!
//! [`GymEnv`] is what a worker drives: plain observation vectors in, one
//! [`Transition`] out per step. [`SessionEnv`] puts any
//! [`environment::Environment`] behind it.

use environment::{Environment, EnvironmentError, ResetRequest};
use messaging::{Spaces, State};

/// Builds the environment inside its worker thread.
pub type EnvFactory = Box<dyn FnOnce() -> Result<Box<dyn GymEnv>, EnvironmentError> + Send>;

/// Side information of one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInfo {
    pub frame_number: u64,
    pub termination_reason: Option<String>,
    /// The observation that ended the episode, when the worker reset
    /// automatically and replaced it with the first observation of the next.
    pub terminal_observation: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub observation: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    pub info: StepInfo,
}

impl Transition {
    /// The transition a simulator state describes.
    #[must_use]
    pub fn from_state(state: State) -> Self {
        Self {
            observation: state.observables,
            reward: state.signal,
            done: state.terminated,
            info: StepInfo {
                frame_number: state.frame_number,
                termination_reason: state.termination_reason,
                terminal_observation: None,
            },
        }
    }
}

/// Single environment as a worker sees it.
pub trait GymEnv {
    /// # Errors
    ///
    /// Whatever the underlying environment reports.
    fn step(&mut self, action: &[f32]) -> Result<Transition, EnvironmentError>;

    /// # Errors
    ///
    /// Whatever the underlying environment reports.
    fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError>;

    /// Reset into the environment's configured task. Plain reset unless
    /// overridden.
    ///
    /// # Errors
    ///
    /// Whatever the underlying environment reports.
    fn reset_task(&mut self) -> Result<Vec<f32>, EnvironmentError> {
        self.reset()
    }

    /// # Errors
    ///
    /// Whatever the underlying environment reports.
    fn spaces(&mut self) -> Result<Spaces, EnvironmentError>;

    fn render(&mut self) {}

    /// # Errors
    ///
    /// Whatever the underlying environment reports.
    fn close(&mut self) -> Result<(), EnvironmentError> {
        Ok(())
    }
}

/// [`GymEnv`] over an [`Environment`] such as an
/// [`environment::EnvironmentSession`].
pub struct SessionEnv<E> {
    env: E,
    task: ResetRequest,
}

impl<E: Environment> SessionEnv<E> {
    #[must_use]
    pub fn new(env: E) -> Self {
        Self { env, task: ResetRequest::new() }
    }

    /// Configurations applied by `reset_task`.
    #[must_use]
    pub fn with_task(mut self, task: ResetRequest) -> Self {
        self.task = task;
        self
    }

    #[must_use]
    pub fn inner(&self) -> &E {
        &self.env
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: Environment> GymEnv for SessionEnv<E> {
    fn step(&mut self, action: &[f32]) -> Result<Transition, EnvironmentError> {
        let state = self.env.react(action.into())?;
        Ok(Transition::from_state(state))
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError> {
        Ok(self.env.reset(ResetRequest::new())?.observables)
    }

    fn reset_task(&mut self) -> Result<Vec<f32>, EnvironmentError> {
        Ok(self.env.reset(self.task.clone())?.observables)
    }

    /// Resets once if the environment has not described itself yet.
    fn spaces(&mut self) -> Result<Spaces, EnvironmentError> {
        if self.env.spaces().is_none() {
            self.env.reset(self.task.clone())?;
        }
        self.env.spaces().cloned().ok_or(EnvironmentError::NoEnvironment)
    }

    fn close(&mut self) -> Result<(), EnvironmentError> {
        self.env.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use environment::{EnvironmentSession, LoopbackConnector, RollingSphere};

    fn sphere_env() -> SessionEnv<EnvironmentSession> {
        let manager = LoopbackConnector::new(RollingSphere::default()).into_manager(Default::default());
        SessionEnv::new(EnvironmentSession::new(manager))
    }

    #[test]
    fn spaces_connect_lazily() {
        let mut env = sphere_env();
        let spaces = env.spaces().unwrap();
        assert_eq!(spaces.action.len(), 1);
        assert_eq!(spaces.observation.len(), 2);
    }

    #[test]
    fn reset_task_applies_the_task_configuration() {
        let mut env = sphere_env().with_task(ResetRequest::new().with_configuration("start_x", 3.0));
        assert_eq!(env.reset().unwrap(), vec![0.0, 0.0]);
        assert_eq!(env.reset_task().unwrap(), vec![3.0, 0.0]);
    }

    #[test]
    fn step_maps_the_state_onto_a_transition() {
        let mut env = sphere_env();
        env.reset().unwrap();
        let transition = env.step(&[10.0]).unwrap();
        assert!((transition.reward - 0.2).abs() < 1e-6);
        assert!(!transition.done);
        assert_eq!(transition.info.frame_number, 1);
    }
}
