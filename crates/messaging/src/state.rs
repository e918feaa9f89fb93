//! Inbound snapshots.

use crate::description::Description;
use crate::reaction::Unobservables;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of one named environment instance.
///
/// States are only ever produced by decoding a response and are replaced,
/// never edited, when a newer one arrives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    pub environment_name: String,
    #[serde(default)]
    pub frame_number: u64,
    #[serde(default)]
    pub observables: Vec<f32>,
    #[serde(default)]
    pub description: Option<Description>,
    #[serde(default)]
    pub terminated: bool,
    #[serde(default)]
    pub termination_reason: Option<String>,
    #[serde(default)]
    pub signal: f32,
    #[serde(default)]
    pub unobservables: Unobservables,
}

impl State {
    /// The attached description, if the simulator sent a non-empty one.
    #[must_use]
    pub fn non_empty_description(&self) -> Option<&Description> {
        self.description.as_ref().filter(|d| !d.is_empty())
    }
}

/// Simulator-wide settings reported alongside every response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulatorConfiguration {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub full_screen: bool,
    #[serde(default)]
    pub quality_level: u32,
    #[serde(default = "unit_time_scale")]
    pub time_scale: f32,
    #[serde(default)]
    pub target_frame_rate: i32,
}

fn unit_time_scale() -> f32 {
    1.0
}

/// Decoded response: states keyed by environment name plus the simulator
/// configuration they were produced under.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub states: BTreeMap<String, State>,
    #[serde(default)]
    pub simulator_configuration: Option<SimulatorConfiguration>,
}

impl Response {
    #[must_use]
    pub fn new(states: impl IntoIterator<Item = State>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|s| (s.environment_name.clone(), s))
                .collect(),
            simulator_configuration: None,
        }
    }

    #[must_use]
    pub fn with_configuration(mut self, configuration: SimulatorConfiguration) -> Self {
        self.simulator_configuration = Some(configuration);
        self
    }

    /// `true` when the simulator had nothing new to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// First state in name order.
    #[must_use]
    pub fn first(&self) -> Option<&State> {
        self.states.values().next()
    }
}
