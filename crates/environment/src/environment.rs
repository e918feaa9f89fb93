//! # Environment Interface
//!
//! The capability every environment kind offers: reset, react, describe and
//! close, plus read access to the latest state and the spaces derived from
//! the latest description.
//!
//! Iterating over an environment is explicit. [`Environment::states`] returns
//! a [`StateStream`] that reacts with a caller supplied policy on every
//! `next()`, ends after yielding a terminal state and can be restarted with a
//! reset.

use crate::error::EnvironmentError;
use messaging::{Configuration, Reaction, Spaces, State, Unobservables};

/// Input to [`Environment::react`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReactInput {
    /// Raw action values, one per actuated degree of freedom in description
    /// order. The motion reaction is inferred from the current description.
    Values(Vec<f32>),
    /// A fully built reaction, sent as is.
    Reaction(Reaction),
}

impl From<Vec<f32>> for ReactInput {
    fn from(values: Vec<f32>) -> Self {
        ReactInput::Values(values)
    }
}

impl From<&[f32]> for ReactInput {
    fn from(values: &[f32]) -> Self {
        ReactInput::Values(values.to_vec())
    }
}

impl From<Reaction> for ReactInput {
    fn from(reaction: Reaction) -> Self {
        ReactInput::Reaction(reaction)
    }
}

/// What a reset should configure and, optionally, restore.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetRequest {
    pub configurations: Vec<Configuration>,
    /// Unobservable state of an earlier snapshot to put back.
    pub restore: Option<Unobservables>,
}

impl ResetRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_configuration(mut self, name: impl Into<String>, value: f32) -> Self {
        self.configurations.push(Configuration::new(name, value));
        self
    }

    /// Reset back to the unobservable state captured in `state`.
    #[must_use]
    pub fn restoring(mut self, state: &State) -> Self {
        self.restore = Some(state.unobservables.clone());
        self
    }

    pub(crate) fn into_reaction(self) -> Reaction {
        let reaction = Reaction::configure(self.configurations);
        match self.restore {
            Some(unobservables) => reaction.with_unobservables(unobservables),
            None => reaction,
        }
    }
}

/// Capability interface shared by every environment kind.
pub trait Environment {
    /// Start a new episode.
    ///
    /// # Errors
    ///
    /// [`EnvironmentError::NoEnvironment`] when the simulator returned no
    /// state; connection and protocol errors otherwise.
    fn reset(&mut self, request: ResetRequest) -> Result<State, EnvironmentError>;

    /// Advance the simulation by one reaction.
    ///
    /// # Errors
    ///
    /// [`EnvironmentError::ActionSpaceMismatch`] when raw values do not match
    /// the action space, [`EnvironmentError::NoEnvironment`] when the
    /// simulator returned no state.
    fn react(&mut self, input: ReactInput) -> Result<State, EnvironmentError>;

    /// Refresh the description and spaces without advancing the simulation.
    /// `Ok(None)` means the simulator had nothing new.
    ///
    /// # Errors
    ///
    /// Connection and protocol errors.
    fn describe(&mut self) -> Result<Option<State>, EnvironmentError>;

    /// Release the environment. Idempotent.
    ///
    /// # Errors
    ///
    /// Implementation specific; closing a session never fails.
    fn close(&mut self) -> Result<(), EnvironmentError>;

    fn spaces(&self) -> Option<&Spaces>;

    fn last_state(&self) -> Option<&State>;

    /// Lazily react with `policy` until the episode terminates.
    fn states<P>(&mut self, policy: P) -> StateStream<'_, Self, P>
    where
        Self: Sized,
        P: FnMut(&State, &Spaces) -> Vec<f32>,
    {
        StateStream::new(self, policy)
    }
}

/// Lazy sequence of states produced by reacting with a policy.
///
/// The first `next()` resets the environment if it has no state yet. The
/// stream yields the terminal state of an episode and then ends; an error
/// also ends it. [`StateStream::restart`] resets and resumes.
pub struct StateStream<'a, E: ?Sized, P> {
    env: &'a mut E,
    policy: P,
    finished: bool,
}

impl<'a, E, P> StateStream<'a, E, P>
where
    E: Environment + ?Sized,
    P: FnMut(&State, &Spaces) -> Vec<f32>,
{
    #[must_use]
    pub fn new(env: &'a mut E, policy: P) -> Self {
        Self { env, policy, finished: false }
    }

    /// Reset the environment and resume the stream from the new episode.
    ///
    /// # Errors
    ///
    /// Whatever the reset returns.
    pub fn restart(&mut self, request: ResetRequest) -> Result<State, EnvironmentError> {
        let state = self.env.reset(request)?;
        self.finished = state.terminated;
        Ok(state)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish_with(&mut self, result: Result<State, EnvironmentError>) -> Option<Result<State, EnvironmentError>> {
        match &result {
            Ok(state) => self.finished = state.terminated,
            Err(_) => self.finished = true,
        }
        Some(result)
    }
}

impl<E, P> Iterator for StateStream<'_, E, P>
where
    E: Environment + ?Sized,
    P: FnMut(&State, &Spaces) -> Vec<f32>,
{
    type Item = Result<State, EnvironmentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let action = match (self.env.last_state(), self.env.spaces()) {
            (Some(state), Some(spaces)) if !state.terminated => (self.policy)(state, spaces),
            _ => {
                let reset = self.env.reset(ResetRequest::default());
                return self.finish_with(reset);
            }
        };
        let result = self.env.react(ReactInput::Values(action));
        self.finish_with(result)
    }
}
