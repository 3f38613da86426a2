//! Per-tick steering for a single agent.
//!
//! Every behavior kind maps statically to one evaluation routine. A tick
//! evaluates all components configured for the agent's state, orders them by
//! priority, then blends them onto the current velocity. A component whose
//! contribution would push the speed past the maximum is rejected outright
//! rather than clamped.

use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::agent::{Agent, AgentArena, Team};
use crate::genome::{BehaviorComponent, BehaviorKind, ParameterGenome, StateConfig};
use crate::vector::Vector;

/// Configuration errors raised while evaluating behaviors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BehaviorError {
    #[error("agent {agent} has no target assigned for {behavior}")]
    MissingTarget { agent: String, behavior: BehaviorKind },
    #[error("agent {agent} targets an agent that is not registered in the world")]
    UnknownTarget { agent: String },
}

/// Next velocity and position for one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub velocity: Vector,
    pub position: Vector,
}

/// Wrap one coordinate into `[0, extent)`.
#[must_use]
pub fn wrap_axis(value: f64, extent: f64) -> f64 {
    if extent <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs.
    if wrapped >= extent { 0.0 } else { wrapped }
}

/// Blend weighted forces onto `initial` in the given order, skipping any that
/// would exceed `max_velocity`.
#[must_use]
pub fn blend(initial: Vector, forces: &[(BehaviorComponent, Vector)], max_velocity: f64) -> Vector {
    let mut accumulated = initial;
    for (component, force) in forces {
        let candidate = accumulated + component.weight * *force;
        if candidate.length() > max_velocity {
            continue;
        }
        accumulated = candidate;
    }
    accumulated
}

/// Read-only view of one agent inside a world snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Steering<'a> {
    agents: &'a AgentArena,
    index: usize,
    agent: &'a Agent,
    config: &'a StateConfig,
    max_velocity: f64,
}

impl<'a> Steering<'a> {
    /// Bind the agent at dense `index` to the configuration of its current state.
    #[must_use]
    pub fn new(
        agents: &'a AgentArena,
        index: usize,
        genome: &'a ParameterGenome,
        max_velocity: f64,
    ) -> Option<Self> {
        let agent = agents.as_slice().get(index)?;
        Some(Self {
            agents,
            index,
            agent,
            config: genome.state(agent.state),
            max_velocity,
        })
    }

    #[must_use]
    pub fn agent(&self) -> &'a Agent {
        self.agent
    }

    /// Agents within `radius` whose bearing from the current heading is at
    /// most `alpha / 2` degrees. The agent itself is never included.
    pub fn neighbors(&self, radius: f64, alpha: f64) -> impl Iterator<Item = &'a Agent> + 'a {
        let me = self.agent;
        let index = self.index;
        let half_cone = alpha / 2.0;
        let enabled = radius > 0.0;
        self.agents
            .as_slice()
            .iter()
            .enumerate()
            .filter(move |(other_index, other)| {
                if !enabled || *other_index == index {
                    return false;
                }
                let delta = other.position - me.position;
                if delta.length() > radius {
                    return false;
                }
                me.velocity.angle(delta) <= half_cone
            })
            .map(|(_, other)| other)
    }

    /// Closest mobile agent of the opposing team inside the cone.
    ///
    /// Exactly equal distances resolve to the earliest registered agent.
    #[must_use]
    pub fn nearest_opponent(&self, radius: f64, alpha: f64) -> Option<&'a Agent> {
        let opponent: Team = self.agent.team.opponent();
        let origin = self.agent.position;
        self.neighbors(radius, alpha)
            .filter(|other| other.team == opponent && !other.is_anchor())
            .min_by_key(|other| OrderedFloat(origin.distance(other.position)))
    }

    fn target(&self, behavior: BehaviorKind) -> Result<&'a Agent, BehaviorError> {
        let id = self.agent.target.ok_or_else(|| BehaviorError::MissingTarget {
            agent: self.agent.name.clone(),
            behavior,
        })?;
        self.agents.get(id).ok_or_else(|| BehaviorError::UnknownTarget {
            agent: self.agent.name.clone(),
        })
    }

    fn centroid_of(&self, component: &BehaviorComponent) -> Option<Vector> {
        Vector::mean(
            self.neighbors(f64::from(component.radius), f64::from(component.alpha))
                .map(|n| n.position),
        )
    }

    /// Toward the neighbor centroid, stronger the farther away it sits.
    #[must_use]
    pub fn cohesion(&self, component: &BehaviorComponent) -> Vector {
        let Some(center) = self.centroid_of(component) else {
            return Vector::zero();
        };
        let delta = center - self.agent.position;
        let scale = (delta.length() / f64::from(component.radius)).powi(2).min(1.0);
        self.max_velocity * delta.unit() * scale
    }

    /// Toward the average neighbor heading at full speed.
    #[must_use]
    pub fn alignment(&self, component: &BehaviorComponent) -> Vector {
        let average = Vector::mean(
            self.neighbors(f64::from(component.radius), f64::from(component.alpha))
                .map(|n| n.velocity),
        );
        match average {
            Some(velocity) => self.max_velocity * velocity.unit(),
            None => Vector::zero(),
        }
    }

    /// Away from the neighbor centroid, stronger the closer it sits.
    #[must_use]
    pub fn separation(&self, component: &BehaviorComponent) -> Vector {
        let Some(center) = self.centroid_of(component) else {
            return Vector::zero();
        };
        let radius = f64::from(component.radius);
        let delta = center - self.agent.position;
        let scale = ((radius - delta.length()) / radius).powi(2);
        -(self.max_velocity * delta.unit() * scale)
    }

    /// Away from the nearest opponent, stronger the closer it sits.
    #[must_use]
    pub fn avoidance(&self, component: &BehaviorComponent) -> Vector {
        let radius = f64::from(component.radius);
        let Some(threat) = self.nearest_opponent(radius, f64::from(component.alpha)) else {
            return Vector::zero();
        };
        let delta = threat.position - self.agent.position;
        let scale = ((radius - delta.length()) / radius).powi(2);
        -(self.max_velocity * delta.unit() * scale)
    }

    /// Full speed toward the assigned target.
    pub fn seeking(&self) -> Result<Vector, BehaviorError> {
        let target = self.target(BehaviorKind::Seeking)?;
        Ok(self.max_velocity * (target.position - self.agent.position).unit())
    }

    /// Full speed sideways whenever anything is inside the cone.
    #[must_use]
    pub fn clearance(&self, component: &BehaviorComponent) -> Vector {
        let blocked = self
            .neighbors(f64::from(component.radius), f64::from(component.alpha))
            .next()
            .is_some();
        if blocked {
            self.max_velocity * self.agent.velocity.orthogonal().unit()
        } else {
            Vector::zero()
        }
    }

    /// Full speed toward the assigned target (home or guarded anchor).
    pub fn homing(&self) -> Result<Vector, BehaviorError> {
        let target = self.target(BehaviorKind::Homing)?;
        Ok(self.max_velocity * (target.position - self.agent.position).unit())
    }

    /// Raw desired direction for one configured behavior.
    pub fn evaluate(
        &self,
        kind: BehaviorKind,
        component: &BehaviorComponent,
    ) -> Result<Vector, BehaviorError> {
        match kind {
            BehaviorKind::Cohesion => Ok(self.cohesion(component)),
            BehaviorKind::Alignment => Ok(self.alignment(component)),
            BehaviorKind::Separation => Ok(self.separation(component)),
            BehaviorKind::Avoidance => Ok(self.avoidance(component)),
            BehaviorKind::Seeking => self.seeking(),
            BehaviorKind::Clearance => Ok(self.clearance(component)),
            BehaviorKind::Homing => self.homing(),
        }
    }

    /// Evaluated forces in blend order.
    pub fn forces(&self) -> Result<Vec<(BehaviorComponent, Vector)>, BehaviorError> {
        self.config
            .by_priority()
            .into_iter()
            .map(|(kind, component)| {
                self.evaluate(kind, &component)
                    .map(|force| (component, force))
            })
            .collect()
    }

    /// Velocity for the next tick.
    pub fn next_velocity(&self) -> Result<Vector, BehaviorError> {
        let forces = self.forces()?;
        Ok(blend(self.agent.velocity, &forces, self.max_velocity))
    }

    /// Velocity and toroidally wrapped position for the next tick.
    pub fn next_motion(&self, width: f64, height: f64) -> Result<Motion, BehaviorError> {
        let velocity = self.next_velocity()?;
        let moved = self.agent.position + velocity;
        Ok(Motion {
            velocity,
            position: Vector::new(wrap_axis(moved.x, width), wrap_axis(moved.y, height)),
        })
    }
}
