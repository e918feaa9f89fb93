//! # In-Process Simulators
//!
//! A [`LocalSimulator`] answers reaction batches directly, without a game
//! engine. [`LoopbackConnector`] plugs one into a [`ConnectionManager`] so the
//! full protocol stack (codec, handshake, exchange, session) runs without a
//! socket, and [`crate::SimulatorServer`] exposes one over TCP.
//!
//! [`RollingSphere`] is the bundled simulator: a sphere on a track that is
//! pushed left or right and must stay within the track bounds.
//!
//! [`ConnectionManager`]: connection::ConnectionManager

use connection::{ConnectionConfig, ConnectionManager, Connector, Endpoint, Transport, TransportError};
use messaging::{
    Actor, Body, Configurable, Description, JsonCodec, Motor, ObserverDescription, Reaction, Response,
    SimulatorConfiguration, Space, State, Unobservables,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Simulator side of the protocol.
pub trait LocalSimulator: Send {
    /// Apply a reaction batch and report the resulting states. An empty
    /// response means nothing changed.
    fn handle(&mut self, reactions: &[Reaction]) -> Response;
}

/// Opens [`LoopbackTransport`]s to one shared simulator.
pub struct LoopbackConnector<S> {
    simulator: Arc<Mutex<S>>,
}

impl<S: LocalSimulator + 'static> LoopbackConnector<S> {
    #[must_use]
    pub fn new(simulator: S) -> Self {
        Self { simulator: Arc::new(Mutex::new(simulator)) }
    }

    #[must_use]
    pub fn shared(simulator: Arc<Mutex<S>>) -> Self {
        Self { simulator }
    }

    #[must_use]
    pub fn simulator(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.simulator)
    }

    /// A connection manager wired to this simulator.
    #[must_use]
    pub fn into_manager(self, config: ConnectionConfig) -> ConnectionManager {
        ConnectionManager::new(config, Box::new(self), Arc::new(JsonCodec))
    }
}

impl<S: LocalSimulator + 'static> Connector for LoopbackConnector<S> {
    fn open(&mut self, _endpoint: &Endpoint, _timeout: Duration) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(LoopbackTransport { simulator: Some(Arc::clone(&self.simulator)) }))
    }
}

/// Encodes, hands the batch to the simulator and encodes its answer.
pub struct LoopbackTransport<S> {
    simulator: Option<Arc<Mutex<S>>>,
}

impl<S: LocalSimulator> Transport for LoopbackTransport<S> {
    fn request(&mut self, payload: &[u8], _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let simulator = self.simulator.as_ref().ok_or(TransportError::Closed)?;
        let reactions = JsonCodec
            .decode_reactions(payload)
            .map_err(|e| TransportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let response = simulator.lock().handle(&reactions);
        if response.is_empty() {
            return Ok(Vec::new());
        }
        JsonCodec
            .encode_response(&response)
            .map_err(|e| TransportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    fn close(&mut self) {
        self.simulator = None;
    }
}

const TRACK_HALF_LENGTH: f32 = 5.0;
const FORCE_LIMIT: f32 = 10.0;
const FORCE_GAIN: f32 = 0.02;

/// A sphere pushed along a one dimensional track.
///
/// The single motor `sphere.force` is clamped to the configurable force
/// limit. The signal is the distance travelled in the step and the episode
/// terminates once the sphere leaves the track. Configurables: `start_x`
/// (initial position) and `force_limit`, which also rescales the motor space
/// of the description.
#[derive(Debug, Clone)]
pub struct RollingSphere {
    name: String,
    pos_x: f32,
    vel_x: f32,
    frame_number: u64,
    terminated: bool,
    force_limit: f32,
    start_x: f32,
    describe_after: u32,
    probes_seen: u32,
}

impl Default for RollingSphere {
    fn default() -> Self {
        Self::new("rolling_sphere")
    }
}

impl RollingSphere {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pos_x: 0.0,
            vel_x: 0.0,
            frame_number: 0,
            terminated: false,
            force_limit: FORCE_LIMIT,
            start_x: 0.0,
            describe_after: 0,
            probes_seen: 0,
        }
    }

    /// Answer the first `probes` describe requests with an empty description,
    /// as a simulator still loading its scene would.
    #[must_use]
    pub fn describe_after(mut self, probes: u32) -> Self {
        self.describe_after = probes;
        self
    }

    #[must_use]
    pub fn position(&self) -> f32 {
        self.pos_x
    }

    #[must_use]
    pub fn description(&self) -> Description {
        let mut actors = BTreeMap::new();
        actors.insert(
            "sphere".to_owned(),
            Actor {
                name: "sphere".to_owned(),
                alive: !self.terminated,
                motors: vec![Motor {
                    name: "force".to_owned(),
                    space: Space::new(2, -self.force_limit, self.force_limit),
                }],
            },
        );
        let mut configurables = BTreeMap::new();
        for (name, space, value) in [
            ("force_limit", Space::new(2, 0.0, 100.0), self.force_limit),
            ("start_x", Space::new(2, -TRACK_HALF_LENGTH, TRACK_HALF_LENGTH), self.start_x),
        ] {
            configurables.insert(
                name.to_owned(),
                Configurable { name: name.to_owned(), space, current_value: value },
            );
        }
        Description {
            api_version: messaging::SCHEMA_VERSION.to_string(),
            actors,
            configurables,
            observers: vec![
                ObserverDescription {
                    name: "position".to_owned(),
                    spaces: vec![Space::new(3, -2.0 * TRACK_HALF_LENGTH, 2.0 * TRACK_HALF_LENGTH)],
                },
                ObserverDescription {
                    name: "velocity".to_owned(),
                    spaces: vec![Space::new(3, -FORCE_GAIN * 100.0, FORCE_GAIN * 100.0)],
                },
            ],
            signal_space: Space::new(4, -FORCE_GAIN * 100.0, FORCE_GAIN * 100.0),
        }
    }

    fn reset(&mut self, reaction: &Reaction) {
        for configuration in reaction.configurations() {
            match configuration.configurable_name.as_str() {
                "force_limit" => self.force_limit = configuration.configurable_value.abs(),
                "start_x" => self.start_x = configuration.configurable_value,
                other => trace!(configurable = other, "ignoring unknown configurable"),
            }
        }
        self.pos_x = self.start_x;
        self.vel_x = 0.0;
        if let Some(body) = reaction.unobservables().and_then(|u| u.bodies.first()) {
            self.pos_x = body.position[0];
            self.vel_x = body.velocity[0];
        }
        self.frame_number = 0;
        self.terminated = false;
    }

    /// Apply the motions of one reaction; returns the signal.
    fn step(&mut self, reaction: &Reaction) -> f32 {
        if self.terminated {
            return 0.0;
        }
        let force = reaction
            .motions()
            .iter()
            .filter(|m| m.actor_name == "sphere" && m.motor_name == "force")
            .map(|m| m.strength)
            .sum::<f32>()
            .max(-self.force_limit)
            .min(self.force_limit);
        let old_pos_x = self.pos_x;
        self.vel_x = force * FORCE_GAIN;
        self.pos_x += self.vel_x;
        let parameters = reaction.parameters();
        if parameters.episode_count {
            self.frame_number += 1;
        }
        if parameters.terminable && self.pos_x.abs() > TRACK_HALF_LENGTH {
            self.terminated = true;
        }
        self.pos_x - old_pos_x
    }

    fn snapshot(&self, signal: f32, describe: bool) -> State {
        let description = if describe {
            Some(if self.probes_seen > self.describe_after { self.description() } else { Description::default() })
        } else {
            None
        };
        State {
            environment_name: self.name.clone(),
            frame_number: self.frame_number,
            observables: vec![self.pos_x, self.vel_x],
            description,
            terminated: self.terminated,
            termination_reason: self.terminated.then(|| "sphere left the track".to_owned()),
            signal,
            unobservables: Unobservables {
                bodies: vec![Body {
                    position: [self.pos_x, 0.0, 0.0],
                    rotation: [0.0, 0.0, 0.0, 1.0],
                    velocity: [self.vel_x, 0.0, 0.0],
                    angular_velocity: [0.0; 3],
                }],
            },
        }
    }
}

impl LocalSimulator for RollingSphere {
    fn handle(&mut self, reactions: &[Reaction]) -> Response {
        let mut signal = 0.0;
        let mut describe = false;
        for reaction in reactions {
            if let Some(target) = reaction.environment_name() {
                if target != self.name {
                    continue;
                }
            }
            let parameters = reaction.parameters();
            if parameters.describe {
                self.probes_seen = self.probes_seen.saturating_add(1);
                describe = true;
            }
            if parameters.reset {
                self.reset(reaction);
                signal = 0.0;
            }
            if !reaction.motions().is_empty() {
                signal = self.step(reaction);
            }
        }
        Response::new([self.snapshot(signal, describe)]).with_configuration(SimulatorConfiguration {
            api_version: messaging::SCHEMA_VERSION.to_string(),
            time_scale: 1.0,
            target_frame_rate: -1,
            ..SimulatorConfiguration::default()
        })
    }
}
