//! Outbound command units.

use serde::{Deserialize, Serialize};

/// Control flags carried by every reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReactionParameters {
    /// Whether the simulator may end the episode in response to this reaction.
    pub terminable: bool,
    /// Ask the simulator to attach its description to the returned state.
    pub describe: bool,
    /// Whether this reaction counts towards the episode step counter.
    pub episode_count: bool,
    /// Reset the episode before applying configurations.
    #[serde(default)]
    pub reset: bool,
}

impl ReactionParameters {
    /// Zero-effect probe: refresh the description without advancing anything.
    #[must_use]
    pub const fn describe_only() -> Self {
        Self { terminable: false, describe: true, episode_count: false, reset: false }
    }

    /// Ordinary simulation step.
    #[must_use]
    pub const fn step() -> Self {
        Self { terminable: true, describe: false, episode_count: true, reset: false }
    }

    #[must_use]
    pub const fn reset() -> Self {
        Self { terminable: false, describe: true, episode_count: false, reset: true }
    }
}

/// Strength applied to one motor of one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub actor_name: String,
    pub motor_name: String,
    pub strength: f32,
}

impl Motion {
    #[must_use]
    pub fn new(actor_name: impl Into<String>, motor_name: impl Into<String>, strength: f32) -> Self {
        Self { actor_name: actor_name.into(), motor_name: motor_name.into(), strength }
    }
}

/// Value to assign to a configurable of the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub configurable_name: String,
    pub configurable_value: f32,
}

impl Configuration {
    #[must_use]
    pub fn new(configurable_name: impl Into<String>, configurable_value: f32) -> Self {
        Self { configurable_name: configurable_name.into(), configurable_value }
    }
}

/// Pose and velocity of one simulated body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
}

/// Simulator state that is not part of the observables.
///
/// Returned with every state and sent back inside a reset reaction to restore
/// an earlier episode snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Unobservables {
    #[serde(default)]
    pub bodies: Vec<Body>,
}

impl Unobservables {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

/// One outbound command. Immutable once built; construct with [`Reaction::new`]
/// and the consuming `with_*` methods.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reaction {
    environment_name: Option<String>,
    parameters: ReactionParameters,
    #[serde(default)]
    motions: Vec<Motion>,
    #[serde(default)]
    configurations: Vec<Configuration>,
    #[serde(default)]
    unobservables: Option<Unobservables>,
}

impl Reaction {
    #[must_use]
    pub fn new(parameters: ReactionParameters) -> Self {
        Self { parameters, ..Self::default() }
    }

    /// The handshake/describe probe.
    #[must_use]
    pub fn describe() -> Self {
        Self::new(ReactionParameters::describe_only())
    }

    #[must_use]
    pub fn motion(motions: Vec<Motion>) -> Self {
        Self::new(ReactionParameters::step()).with_motions(motions)
    }

    #[must_use]
    pub fn configure(configurations: Vec<Configuration>) -> Self {
        Self::new(ReactionParameters::reset()).with_configurations(configurations)
    }

    #[must_use]
    pub fn with_environment(mut self, name: impl Into<String>) -> Self {
        self.environment_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: ReactionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_motions(mut self, motions: Vec<Motion>) -> Self {
        self.motions = motions;
        self
    }

    #[must_use]
    pub fn with_configurations(mut self, configurations: Vec<Configuration>) -> Self {
        self.configurations = configurations;
        self
    }

    #[must_use]
    pub fn with_unobservables(mut self, unobservables: Unobservables) -> Self {
        self.unobservables = Some(unobservables);
        self
    }

    #[must_use]
    pub fn environment_name(&self) -> Option<&str> {
        self.environment_name.as_deref()
    }

    #[must_use]
    pub fn parameters(&self) -> ReactionParameters {
        self.parameters
    }

    #[must_use]
    pub fn motions(&self) -> &[Motion] {
        &self.motions
    }

    #[must_use]
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    #[must_use]
    pub fn unobservables(&self) -> Option<&Unobservables> {
        self.unobservables.as_ref()
    }
}
