//! # Value Spaces
//!
//! Read-only descriptions of the valid range and granularity of every action,
//! observation and signal dimension exposed by a simulator.
//!
//! Spaces are never edited in place. A session derives a fresh [`Spaces`]
//! bundle from each non-empty [`Description`] it receives and swaps it in as a
//! single value, so a reader always sees the action, observation and signal
//! spaces that belong to the same description.

use crate::description::Description;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Range used when sampling a dimension whose bounds are not finite.
const UNBOUNDED_SAMPLE_RANGE: f32 = 1.0;

/// Valid range and resolution of one scalar dimension.
///
/// `decimal_granularity` is the number of decimals a value is meaningful to.
/// A granularity of `0` marks a discrete (integer valued) dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub decimal_granularity: u32,
    pub min_value: f32,
    pub max_value: f32,
}

impl Space {
    /// A continuous dimension spanning every finite `f32`.
    pub const UNBOUNDED: Space = Space {
        decimal_granularity: 6,
        min_value: f32::MIN,
        max_value: f32::MAX,
    };

    #[must_use]
    pub const fn new(decimal_granularity: u32, min_value: f32, max_value: f32) -> Self {
        Self { decimal_granularity, min_value, max_value }
    }

    #[must_use]
    pub fn span(&self) -> f32 {
        self.max_value - self.min_value
    }

    #[must_use]
    pub const fn is_discrete(&self) -> bool {
        self.decimal_granularity == 0
    }

    /// Number of distinct values of a discrete dimension, `None` for continuous ones.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn discrete_steps(&self) -> Option<u64> {
        if !self.is_discrete() || !self.span().is_finite() || self.span() < 0.0 {
            return None;
        }
        Some(self.span().floor() as u64 + 1)
    }

    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min_value && value <= self.max_value
    }

    /// Clamp `value` into the range and round it to the declared granularity.
    #[must_use]
    pub fn clip(&self, value: f32) -> f32 {
        self.round(value.max(self.min_value).min(self.max_value))
    }

    /// Round `value` to `decimal_granularity` decimals.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn round(&self, value: f32) -> f32 {
        let scale = 10f32.powi(self.decimal_granularity.min(9) as i32);
        let rounded = (value * scale).round() / scale;
        if rounded.is_finite() {
            rounded
        } else {
            value
        }
    }

    /// Draw a uniformly distributed value from a freshly seeded generator.
    #[must_use]
    pub fn sample(&self) -> f32 {
        self.sample_with(&fastrand::Rng::new())
    }

    /// Draw a uniformly distributed value from `rng`.
    ///
    /// Dimensions without finite bounds are sampled from
    /// `[-1, 1]` clamped into the declared range.
    #[must_use]
    pub fn sample_with(&self, rng: &fastrand::Rng) -> f32 {
        let (low, high) = if self.span().is_finite() {
            (self.min_value, self.max_value)
        } else {
            (
                (-UNBOUNDED_SAMPLE_RANGE).max(self.min_value),
                UNBOUNDED_SAMPLE_RANGE.min(self.max_value),
            )
        };
        self.clip(low + rng.f32() * (high - low))
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] @ {} decimals",
            self.min_value, self.max_value, self.decimal_granularity
        )
    }
}

/// One actuated degree of freedom: the motor `motor` on actor `actor`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDimension {
    pub actor: String,
    pub motor: String,
    pub space: Space,
}

/// Ordered action dimensions, in the order the description declares its motors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionSpace {
    dimensions: Vec<ActionDimension>,
}

impl ActionSpace {
    #[must_use]
    pub fn new(dimensions: Vec<ActionDimension>) -> Self {
        Self { dimensions }
    }

    #[must_use]
    pub fn from_description(description: &Description) -> Self {
        let dimensions = description
            .actuation_order()
            .map(|(actor, motor)| ActionDimension {
                actor: actor.name.clone(),
                motor: motor.name.clone(),
                space: motor.space,
            })
            .collect();
        Self { dimensions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    #[must_use]
    pub fn dimensions(&self) -> &[ActionDimension] {
        &self.dimensions
    }

    #[must_use]
    pub fn contains(&self, values: &[f32]) -> bool {
        values.len() == self.len()
            && self
                .dimensions
                .iter()
                .zip(values)
                .all(|(dim, value)| dim.space.contains(*value))
    }

    #[must_use]
    pub fn sample(&self) -> Vec<f32> {
        self.sample_with(&fastrand::Rng::new())
    }

    #[must_use]
    pub fn sample_with(&self, rng: &fastrand::Rng) -> Vec<f32> {
        self.dimensions.iter().map(|dim| dim.space.sample_with(rng)).collect()
    }
}

/// Flattened per-value spaces of the observables vector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationSpace {
    spaces: Vec<Space>,
}

impl ObservationSpace {
    #[must_use]
    pub fn new(spaces: Vec<Space>) -> Self {
        Self { spaces }
    }

    /// Flatten the observer layout of `description`.
    ///
    /// When the description declares no observer dimensions but the state
    /// carries `observable_count` values, every value gets an unbounded space.
    #[must_use]
    pub fn from_description(description: &Description, observable_count: usize) -> Self {
        let spaces: Vec<Space> = description
            .observers
            .iter()
            .flat_map(|observer| observer.spaces.iter().copied())
            .collect();
        if spaces.is_empty() && observable_count > 0 {
            return Self { spaces: vec![Space::UNBOUNDED; observable_count] };
        }
        Self { spaces }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    #[must_use]
    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    #[must_use]
    pub fn contains(&self, observables: &[f32]) -> bool {
        observables.len() == self.len()
            && self.spaces.iter().zip(observables).all(|(s, v)| s.contains(*v))
    }
}

/// Range of the scalar reward/cost signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSpace(pub Space);

impl Default for SignalSpace {
    fn default() -> Self {
        Self(Space::UNBOUNDED)
    }
}

/// The three spaces derived from one description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spaces {
    pub action: ActionSpace,
    pub observation: ObservationSpace,
    pub signal: SignalSpace,
}

impl Spaces {
    #[must_use]
    pub fn from_description(description: &Description, observable_count: usize) -> Self {
        Self {
            action: ActionSpace::from_description(description),
            observation: ObservationSpace::from_description(description, observable_count),
            signal: SignalSpace(description.signal_space),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_space_counts_steps() {
        let space = Space::new(0, -1.0, 1.0);
        assert!(space.is_discrete());
        assert_eq!(space.discrete_steps(), Some(3));
        assert_eq!(Space::new(2, 0.0, 1.0).discrete_steps(), None);
    }

    #[test]
    fn clip_rounds_to_granularity() {
        let space = Space::new(1, -10.0, 10.0);
        assert!((space.clip(3.14) - 3.1).abs() < 1e-6);
        assert!((space.clip(42.0) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn samples_stay_inside_range() {
        let rng = fastrand::Rng::with_seed(7);
        let space = Space::new(2, -0.5, 0.5);
        for _ in 0..1_000 {
            let v = space.sample_with(&rng);
            assert!(space.contains(v), "{v} escaped {space}");
        }
    }

    #[test]
    fn unbounded_samples_are_finite() {
        let rng = fastrand::Rng::with_seed(3);
        for _ in 0..100 {
            assert!(Space::UNBOUNDED.sample_with(&rng).is_finite());
        }
    }
}
