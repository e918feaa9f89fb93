//! Static structural metadata a simulator reports about an environment.

use crate::space::Space;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single actuator on an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    pub name: String,
    pub space: Space,
}

/// An entity that owns motors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    #[serde(default = "alive")]
    pub alive: bool,
    #[serde(default)]
    pub motors: Vec<Motor>,
}

fn alive() -> bool {
    true
}

/// A value of the simulator that can be set through a configuration reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configurable {
    pub name: String,
    pub space: Space,
    #[serde(default)]
    pub current_value: f32,
}

/// A named group of consecutive observable values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverDescription {
    pub name: String,
    #[serde(default)]
    pub spaces: Vec<Space>,
}

/// Layout of an environment: actors and their motors, configurables,
/// observers and the signal range.
///
/// Actors and configurables are keyed by name, so iteration order is the
/// name order. That order is the canonical action dimension ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub actors: BTreeMap<String, Actor>,
    #[serde(default)]
    pub configurables: BTreeMap<String, Configurable>,
    #[serde(default)]
    pub observers: Vec<ObserverDescription>,
    #[serde(default = "unbounded")]
    pub signal_space: Space,
}

fn unbounded() -> Space {
    Space::UNBOUNDED
}

impl Default for Description {
    fn default() -> Self {
        Self {
            api_version: String::new(),
            actors: BTreeMap::new(),
            configurables: BTreeMap::new(),
            observers: Vec::new(),
            signal_space: Space::UNBOUNDED,
        }
    }
}

impl Description {
    /// A description is empty when it declares nothing at all.
    ///
    /// Simulators answer probes with an empty description until their scene
    /// has finished loading.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty() && self.configurables.is_empty() && self.observers.is_empty()
    }

    /// Every `(actor, motor)` pair in action dimension order.
    pub fn actuation_order(&self) -> impl Iterator<Item = (&Actor, &Motor)> {
        self.actors
            .values()
            .flat_map(|actor| actor.motors.iter().map(move |motor| (actor, motor)))
    }

    /// Number of actuated degrees of freedom.
    #[must_use]
    pub fn action_dimensions(&self) -> usize {
        self.actuation_order().count()
    }

    #[must_use]
    pub fn observer(&self, name: &str) -> Option<&ObserverDescription> {
        self.observers.iter().find(|o| o.name == name)
    }

    #[must_use]
    pub fn configurable(&self, name: &str) -> Option<&Configurable> {
        self.configurables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_actor_description() -> Description {
        let motor = |name: &str| Motor { name: name.to_owned(), space: Space::new(2, -1.0, 1.0) };
        let mut actors = BTreeMap::new();
        actors.insert(
            "b_arm".to_owned(),
            Actor { name: "b_arm".to_owned(), alive: true, motors: vec![motor("elbow"), motor("wrist")] },
        );
        actors.insert(
            "a_base".to_owned(),
            Actor { name: "a_base".to_owned(), alive: true, motors: vec![motor("wheel")] },
        );
        Description { actors, ..Description::default() }
    }

    #[test]
    fn actuation_order_follows_actor_names_then_motor_declaration() {
        let description = two_actor_description();
        let order: Vec<_> = description
            .actuation_order()
            .map(|(a, m)| format!("{}.{}", a.name, m.name))
            .collect();
        assert_eq!(order, ["a_base.wheel", "b_arm.elbow", "b_arm.wrist"]);
        assert_eq!(description.action_dimensions(), 3);
    }

    #[test]
    fn default_description_is_empty() {
        assert!(Description::default().is_empty());
        assert!(!two_actor_description().is_empty());
    }
}
