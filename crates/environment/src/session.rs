//! # Environment Session
//!
//! Stateful client handle to one simulator endpoint.
//!
//! ```text
//! Uninitialized --connect--> Handshaking --confirmed--> Ready --close--> Closed
//!       ^                         |                     |  ^
//!       +------handshake failed---+                     +--+ reset/react/describe
//! ```
//!
//! `Closed` is terminal: every operation except `close` itself then fails
//! with [`EnvironmentError::SessionClosed`].
//!
//! Whenever a response carries a non-empty description the action,
//! observation and signal spaces are rebuilt from it and swapped in as one
//! [`Spaces`] value.

use crate::environment::{Environment, ReactInput, ResetRequest};
use crate::error::EnvironmentError;
use crate::exchange::ReactionExchange;
use connection::{ConnectionConfig, ConnectionEvent, ConnectionManager, Endpoint};
use messaging::{
    Description, Motion, ObserverDescription, Reaction, Response, SimulatorConfiguration, Spaces, State,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Uninitialized,
    Handshaking,
    Ready,
    Closed,
}

/// Networked [`Environment`].
#[derive(Debug)]
pub struct EnvironmentSession {
    exchange: ReactionExchange,
    state: SessionState,
    last_states: BTreeMap<String, State>,
    description: Option<Description>,
    spaces: Option<Spaces>,
    simulator_configuration: Option<SimulatorConfiguration>,
}

impl EnvironmentSession {
    #[must_use]
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            exchange: ReactionExchange::new(connection),
            state: SessionState::Uninitialized,
            last_states: BTreeMap::new(),
            description: None,
            spaces: None,
            simulator_configuration: None,
        }
    }

    /// Session over TCP with the JSON codec.
    #[must_use]
    pub fn tcp(config: ConnectionConfig) -> Self {
        Self::new(ConnectionManager::tcp(config))
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Ready && self.exchange.connection().is_connected()
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        self.exchange.connection().endpoint()
    }

    #[must_use]
    pub fn last_states(&self) -> &BTreeMap<String, State> {
        &self.last_states
    }

    #[must_use]
    pub fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    #[must_use]
    pub fn simulator_configuration(&self) -> Option<&SimulatorConfiguration> {
        self.simulator_configuration.as_ref()
    }

    #[must_use]
    pub fn observer(&self, name: &str) -> Option<&ObserverDescription> {
        self.description.as_ref()?.observer(name)
    }

    /// Register a lifecycle callback on the underlying connection.
    pub fn on_event(&mut self, event: ConnectionEvent, listener: impl FnMut() + Send + 'static) {
        self.exchange.connection_mut().on_event(event, listener);
    }

    /// Run the connection handshake and seed the session from its response.
    ///
    /// Also used to reconnect after the simulator dropped the connection.
    ///
    /// # Errors
    ///
    /// [`EnvironmentError::ConnectionTimeout`] when the simulator never
    /// described itself; the session is then back in `Uninitialized`.
    pub fn connect(&mut self) -> Result<(), EnvironmentError> {
        self.ensure_open()?;
        self.state = SessionState::Handshaking;
        match self.exchange.connection_mut().connect() {
            Ok(response) => {
                self.apply(response);
                self.state = SessionState::Ready;
                info!(endpoint = %self.endpoint(), "session ready");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Uninitialized;
                Err(e.into())
            }
        }
    }

    fn ensure_open(&self) -> Result<(), EnvironmentError> {
        if self.state == SessionState::Closed {
            return Err(EnvironmentError::SessionClosed);
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), EnvironmentError> {
        self.ensure_open()?;
        if self.state != SessionState::Ready {
            return Err(EnvironmentError::NotConnected);
        }
        Ok(())
    }

    /// Turn raw action values into motions, one per actuated degree of
    /// freedom in description order.
    fn infer_motion(&self, values: &[f32]) -> Result<Reaction, EnvironmentError> {
        let expected = self.description.as_ref().map_or(0, Description::action_dimensions);
        if values.len() != expected {
            return Err(EnvironmentError::ActionSpaceMismatch { expected, actual: values.len() });
        }
        let motions = self
            .description
            .iter()
            .flat_map(|description| description.actuation_order())
            .zip(values)
            .map(|((actor, motor), value)| Motion::new(&actor.name, &motor.name, *value))
            .collect();
        Ok(Reaction::motion(motions))
    }

    /// Exchange a single reaction and require a state back.
    fn exchange_one(&mut self, reaction: Reaction) -> Result<State, EnvironmentError> {
        let response = self.exchange.exchange(&[reaction])?.ok_or(EnvironmentError::NoEnvironment)?;
        let state = response.first().cloned().ok_or(EnvironmentError::NoEnvironment)?;
        self.apply(response);
        Ok(state)
    }

    /// Replace the session's view with `response`.
    fn apply(&mut self, response: Response) {
        self.refresh_statics(&response);
        self.last_states = response.states;
    }

    /// Update the description, spaces and simulator configuration only.
    fn refresh_statics(&mut self, response: &Response) {
        if let Some(configuration) = &response.simulator_configuration {
            self.simulator_configuration = Some(configuration.clone());
        }
        let described = response
            .states
            .values()
            .find_map(|state| state.non_empty_description().map(|d| (d, state.observables.len())));
        if let Some((description, observable_count)) = described {
            let spaces = Spaces::from_description(description, observable_count);
            debug!(
                actions = spaces.action.len(),
                observations = spaces.observation.len(),
                "spaces rebuilt from description"
            );
            self.description = Some(description.clone());
            self.spaces = Some(spaces);
        }
    }
}

impl Environment for EnvironmentSession {
    /// Valid from `Handshaking` or `Ready`; an `Uninitialized` session
    /// connects first.
    fn reset(&mut self, request: ResetRequest) -> Result<State, EnvironmentError> {
        self.ensure_open()?;
        if self.state == SessionState::Uninitialized {
            self.connect()?;
        }
        let state = self.exchange_one(request.into_reaction())?;
        self.state = SessionState::Ready;
        Ok(state)
    }

    fn react(&mut self, input: ReactInput) -> Result<State, EnvironmentError> {
        self.ensure_ready()?;
        let reaction = match input {
            ReactInput::Values(values) => self.infer_motion(&values)?,
            ReactInput::Reaction(reaction) => reaction,
        };
        self.exchange_one(reaction)
    }

    /// Leaves the last known states alone, so their `terminated` and
    /// `signal` are unaffected; environments seen for the first time are
    /// recorded.
    fn describe(&mut self) -> Result<Option<State>, EnvironmentError> {
        self.ensure_ready()?;
        let Some(response) = self.exchange.exchange(&[Reaction::describe()])? else {
            return Ok(None);
        };
        self.refresh_statics(&response);
        let first = response.first().cloned();
        for (name, state) in response.states {
            self.last_states.entry(name).or_insert(state);
        }
        Ok(first)
    }

    fn close(&mut self) -> Result<(), EnvironmentError> {
        if self.state != SessionState::Closed {
            self.exchange.connection_mut().close();
            self.state = SessionState::Closed;
            info!(endpoint = %self.endpoint(), "session closed");
        }
        Ok(())
    }

    fn spaces(&self) -> Option<&Spaces> {
        self.spaces.as_ref()
    }

    fn last_state(&self) -> Option<&State> {
        self.last_states.values().next()
    }
}
