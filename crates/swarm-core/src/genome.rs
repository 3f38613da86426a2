//! Bounded behavior parameters evolved by the optimizer.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Upper bound for behavior radii (inclusive).
pub const RADIUS_MAX: u32 = 500;
/// Upper bound for heading cones in degrees (inclusive).
pub const ALPHA_MAX: u32 = 359;
/// Upper bound for guard thresholds (inclusive).
pub const GUARD_THRESHOLD_MAX: u8 = 5;

/// Closed set of behavior forces, in declaration order.
///
/// The derived ordering doubles as the tie-break when two components share a
/// priority value.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Cohesion,
    Alignment,
    Separation,
    Avoidance,
    Seeking,
    Clearance,
    Homing,
}

impl BehaviorKind {
    pub const ALL: [Self; 7] = [
        Self::Cohesion,
        Self::Alignment,
        Self::Separation,
        Self::Avoidance,
        Self::Seeking,
        Self::Clearance,
        Self::Homing,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cohesion => "cohesion",
            Self::Alignment => "alignment",
            Self::Separation => "separation",
            Self::Avoidance => "avoidance",
            Self::Seeking => "seeking",
            Self::Clearance => "clearance",
            Self::Homing => "homing",
        }
    }

    /// Whether evaluating this behavior requires an assigned target.
    #[must_use]
    pub const fn needs_target(self) -> bool {
        matches!(self, Self::Seeking | Self::Homing)
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behavioral state of a mobile agent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Spreading,
    Seeking,
    Caravan,
    Guarding,
}

impl AgentState {
    pub const ALL: [Self; 4] = [Self::Spreading, Self::Seeking, Self::Caravan, Self::Guarding];
}

/// Weight, reach, cone, and evaluation order of one behavior force.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BehaviorComponent {
    /// Blend weight in `[0, 1]`.
    pub weight: f64,
    /// Neighborhood radius in `[0, RADIUS_MAX]`.
    pub radius: u32,
    /// Full heading cone in degrees, `[0, ALPHA_MAX]`; neighbors must lie within half of it.
    pub alpha: u32,
    /// Lower values are blended first.
    pub priority: i32,
}

impl BehaviorComponent {
    #[must_use]
    pub const fn new(weight: f64, radius: u32, alpha: u32, priority: i32) -> Self {
        Self {
            weight,
            radius,
            alpha,
            priority,
        }
    }

    /// Sample every field uniformly within its valid range.
    pub fn random(rng: &mut dyn RngCore) -> Self {
        Self {
            weight: round3(rng.random_range(0.0..=1.0)),
            radius: rng.random_range(0..=RADIUS_MAX),
            alpha: rng.random_range(0..=ALPHA_MAX),
            priority: rng.random_range(0..BehaviorKind::ALL.len() as i32),
        }
    }

    fn mutate(&mut self, rng: &mut dyn RngCore, rates: &MutationRates) {
        if rng.random::<f64>() < rates.probability {
            let nudge = rng.random_range(-rates.weight..=rates.weight);
            self.weight = round3((self.weight + nudge).clamp(0.0, 1.0));
        }
        if rng.random::<f64>() < rates.probability {
            self.radius = nudge_bounded(rng, self.radius, rates.radius, RADIUS_MAX);
        }
        if rng.random::<f64>() < rates.probability {
            self.alpha = nudge_bounded(rng, self.alpha, rates.alpha, ALPHA_MAX);
        }
    }
}

/// Behavior components active in one agent state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct StateConfig {
    components: BTreeMap<BehaviorKind, BehaviorComponent>,
}

impl StateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, kind: BehaviorKind, component: BehaviorComponent) -> Self {
        self.components.insert(kind, component);
        self
    }

    pub fn insert(&mut self, kind: BehaviorKind, component: BehaviorComponent) {
        self.components.insert(kind, component);
    }

    #[must_use]
    pub fn get(&self, kind: BehaviorKind) -> Option<&BehaviorComponent> {
        self.components.get(&kind)
    }

    /// Components in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (BehaviorKind, &BehaviorComponent)> {
        self.components.iter().map(|(kind, component)| (*kind, component))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BehaviorKind, &mut BehaviorComponent)> {
        self.components
            .iter_mut()
            .map(|(kind, component)| (*kind, component))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Components sorted by ascending priority, ties kept in declaration order.
    #[must_use]
    pub fn by_priority(&self) -> Vec<(BehaviorKind, BehaviorComponent)> {
        let mut ordered: Vec<_> = self.iter().map(|(kind, c)| (kind, *c)).collect();
        ordered.sort_by_key(|(_, component)| component.priority);
        ordered
    }
}

/// Per-field mutation probability and nudge magnitudes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MutationRates {
    /// Independent probability that any single field is nudged.
    pub probability: f64,
    /// Maximum absolute weight nudge.
    pub weight: f64,
    /// Maximum absolute radius nudge.
    pub radius: u32,
    /// Maximum absolute alpha nudge.
    pub alpha: u32,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            probability: 0.2,
            weight: 0.2,
            radius: 20,
            alpha: 20,
        }
    }
}

/// Errors raised when validating genome structures.
#[derive(Debug, Error, PartialEq)]
pub enum GenomeError {
    #[error("{field} threshold {value} exceeds {max}", max = GUARD_THRESHOLD_MAX)]
    ThresholdOutOfRange { field: &'static str, value: u8 },
    #[error("{state:?}.{kind} weight {value} must be between 0.0 and 1.0")]
    WeightOutOfRange {
        state: AgentState,
        kind: BehaviorKind,
        value: f64,
    },
    #[error("{state:?}.{kind} radius {value} exceeds {max}", max = RADIUS_MAX)]
    RadiusOutOfRange {
        state: AgentState,
        kind: BehaviorKind,
        value: u32,
    },
    #[error("{state:?}.{kind} alpha {value} exceeds {max}", max = ALPHA_MAX)]
    AlphaOutOfRange {
        state: AgentState,
        kind: BehaviorKind,
        value: u32,
    },
}

/// Complete evolvable configuration for one team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterGenome {
    pub home_guard_threshold: u8,
    pub depo_guard_threshold: u8,
    pub spreading: StateConfig,
    pub seeking: StateConfig,
    pub caravan: StateConfig,
    pub guarding: StateConfig,
}

impl Default for ParameterGenome {
    fn default() -> Self {
        use BehaviorKind::*;
        let c = BehaviorComponent::new;
        Self {
            home_guard_threshold: 2,
            depo_guard_threshold: 1,
            spreading: StateConfig::new()
                .with(Cohesion, c(0.3, 200, 300, 3))
                .with(Alignment, c(0.4, 150, 300, 2))
                .with(Separation, c(0.6, 60, 300, 1))
                .with(Avoidance, c(0.8, 120, 359, 0))
                .with(Clearance, c(0.2, 40, 90, 4)),
            seeking: StateConfig::new()
                .with(Separation, c(0.4, 40, 300, 1))
                .with(Avoidance, c(0.7, 100, 359, 0))
                .with(Seeking, c(0.9, 0, 0, 2))
                .with(Clearance, c(0.2, 30, 90, 3)),
            caravan: StateConfig::new()
                .with(Cohesion, c(0.2, 150, 300, 3))
                .with(Alignment, c(0.3, 150, 300, 4))
                .with(Separation, c(0.4, 40, 300, 1))
                .with(Avoidance, c(0.7, 100, 359, 0))
                .with(Homing, c(0.9, 0, 0, 2)),
            guarding: StateConfig::new()
                .with(Separation, c(0.5, 50, 359, 1))
                .with(Avoidance, c(0.3, 150, 359, 2))
                .with(Homing, c(0.6, 0, 0, 0)),
        }
    }
}

impl ParameterGenome {
    /// Configuration active while in `state`.
    #[must_use]
    pub fn state(&self, state: AgentState) -> &StateConfig {
        match state {
            AgentState::Spreading => &self.spreading,
            AgentState::Seeking => &self.seeking,
            AgentState::Caravan => &self.caravan,
            AgentState::Guarding => &self.guarding,
        }
    }

    pub fn state_mut(&mut self, state: AgentState) -> &mut StateConfig {
        match state {
            AgentState::Spreading => &mut self.spreading,
            AgentState::Seeking => &mut self.seeking,
            AgentState::Caravan => &mut self.caravan,
            AgentState::Guarding => &mut self.guarding,
        }
    }

    /// Keep the component layout of `self` but resample every numeric field.
    #[must_use]
    pub fn randomized(&self, rng: &mut dyn RngCore) -> Self {
        let mut genome = self.clone();
        genome.home_guard_threshold = rng.random_range(0..=GUARD_THRESHOLD_MAX);
        genome.depo_guard_threshold = rng.random_range(0..=GUARD_THRESHOLD_MAX);
        for state in AgentState::ALL {
            for (_, component) in genome.state_mut(state).iter_mut() {
                *component = BehaviorComponent::random(rng);
            }
        }
        genome
    }

    /// Uniformly random genome over the default component layout.
    pub fn random(rng: &mut dyn RngCore) -> Self {
        Self::default().randomized(rng)
    }

    /// Nudge each field independently; results stay within their bounds.
    pub fn mutate(&mut self, rng: &mut dyn RngCore, rates: &MutationRates) {
        if rng.random::<f64>() < rates.probability {
            self.home_guard_threshold = step_threshold(rng, self.home_guard_threshold);
        }
        if rng.random::<f64>() < rates.probability {
            self.depo_guard_threshold = step_threshold(rng, self.depo_guard_threshold);
        }
        for state in AgentState::ALL {
            for (_, component) in self.state_mut(state).iter_mut() {
                component.mutate(rng, rates);
            }
        }
    }

    /// Check every bounded field.
    pub fn validate(&self) -> Result<(), GenomeError> {
        for (field, value) in [
            ("home_guard", self.home_guard_threshold),
            ("depo_guard", self.depo_guard_threshold),
        ] {
            if value > GUARD_THRESHOLD_MAX {
                return Err(GenomeError::ThresholdOutOfRange { field, value });
            }
        }
        for state in AgentState::ALL {
            for (kind, component) in self.state(state).iter() {
                if !(0.0..=1.0).contains(&component.weight) {
                    return Err(GenomeError::WeightOutOfRange {
                        state,
                        kind,
                        value: component.weight,
                    });
                }
                if component.radius > RADIUS_MAX {
                    return Err(GenomeError::RadiusOutOfRange {
                        state,
                        kind,
                        value: component.radius,
                    });
                }
                if component.alpha > ALPHA_MAX {
                    return Err(GenomeError::AlphaOutOfRange {
                        state,
                        kind,
                        value: component.alpha,
                    });
                }
            }
        }
        Ok(())
    }
}

fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

fn step_threshold(rng: &mut dyn RngCore, value: u8) -> u8 {
    if rng.random::<bool>() {
        value.saturating_add(1).min(GUARD_THRESHOLD_MAX)
    } else {
        value.saturating_sub(1)
    }
}

fn nudge_bounded(rng: &mut dyn RngCore, value: u32, magnitude: u32, max: u32) -> u32 {
    let magnitude = i64::from(magnitude);
    let nudged = i64::from(value) + rng.random_range(-magnitude..=magnitude);
    nudged.clamp(0, i64::from(max)) as u32
}
