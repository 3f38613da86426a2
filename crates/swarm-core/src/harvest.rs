//! State transitions and stash transfers applied between world ticks.
//!
//! The behavior engine never changes an agent's state on its own; a runner
//! applies this policy before each tick to move agents between spreading,
//! seeking, caravan, and guarding.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::agent::{AgentId, Team};
use crate::genome::AgentState;
use crate::vector::Vector;
use crate::world::World;

/// Distances governing harvest transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarvestConfig {
    /// Distance at which a spreading agent notices a deposit.
    pub sight: f64,
    /// Distance at which an agent interacts with an anchor.
    pub reach: f64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sight: 150.0,
            reach: 20.0,
        }
    }
}

/// Counts of stash movements performed by one policy pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub collected: usize,
    pub delivered: usize,
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Assign(AgentState, Option<AgentId>),
    Collect { deposit: AgentId, home: AgentId },
    Deliver { home: AgentId, guard: bool },
}

/// Forage policy shared by both teams, parameterized by each team's guard thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestPolicy {
    config: HarvestConfig,
}

impl HarvestPolicy {
    #[must_use]
    pub const fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Visit every mobile agent in registration order and apply its transition.
    pub fn apply(&self, world: &mut World) -> HarvestReport {
        let mobiles: Vec<AgentId> = world
            .agents()
            .iter()
            .filter(|(_, agent)| !agent.is_anchor())
            .map(|(id, _)| id)
            .collect();

        let mut report = HarvestReport::default();
        for id in mobiles {
            let Some(transition) = self.decide(world, id) else {
                continue;
            };
            match transition {
                Transition::Assign(state, target) => {
                    world.assign(id, state, target);
                }
                Transition::Collect { deposit, home } => {
                    if world.withdraw(deposit) {
                        world.assign(id, AgentState::Caravan, Some(home));
                        report.collected += 1;
                    } else {
                        world.assign(id, AgentState::Spreading, None);
                    }
                }
                Transition::Deliver { home, guard } => {
                    world.deposit(home);
                    report.delivered += 1;
                    if guard {
                        world.assign(id, AgentState::Guarding, Some(home));
                    } else {
                        world.assign(id, AgentState::Spreading, None);
                    }
                }
            }
        }

        if report.collected > 0 || report.delivered > 0 {
            trace!(
                tick = world.time().0,
                collected = report.collected,
                delivered = report.delivered,
                "harvest pass"
            );
        }
        report
    }

    fn decide(&self, world: &World, id: AgentId) -> Option<Transition> {
        let agent = world.agent(id)?;
        let genome = world.genome(agent.team);
        let home = world.home(agent.team);
        match agent.state {
            AgentState::Spreading => {
                let deposit = self.visible_deposit(world, agent.position)?;
                let guards = guard_count(world, agent.team, deposit);
                if guards < usize::from(genome.depo_guard_threshold) {
                    Some(Transition::Assign(AgentState::Guarding, Some(deposit)))
                } else {
                    Some(Transition::Assign(AgentState::Seeking, Some(deposit)))
                }
            }
            AgentState::Seeking => {
                let Some(target) = agent.target.and_then(|t| world.agent(t).map(|a| (t, a)))
                else {
                    return Some(Transition::Assign(AgentState::Spreading, None));
                };
                let (deposit, anchor) = target;
                if anchor.stash() == Some(0) {
                    return Some(Transition::Assign(AgentState::Spreading, None));
                }
                (agent.position.distance(anchor.position) <= self.config.reach)
                    .then_some(Transition::Collect { deposit, home })
            }
            AgentState::Caravan => {
                let anchor = world.agent(home)?;
                if agent.position.distance(anchor.position) > self.config.reach {
                    return None;
                }
                let guard = guard_count(world, agent.team, home)
                    < usize::from(genome.home_guard_threshold);
                Some(Transition::Deliver { home, guard })
            }
            AgentState::Guarding => None,
        }
    }

    /// Closest deposit with remaining stash within sight.
    fn visible_deposit(&self, world: &World, position: Vector) -> Option<AgentId> {
        world
            .resources()
            .iter()
            .filter_map(|id| world.agent(*id).map(|anchor| (*id, anchor)))
            .filter(|(_, anchor)| anchor.stash().is_some_and(|stash| stash > 0))
            .map(|(id, anchor)| (id, position.distance(anchor.position)))
            .filter(|(_, distance)| *distance <= self.config.sight)
            .min_by_key(|(_, distance)| OrderedFloat(*distance))
            .map(|(id, _)| id)
    }
}

/// Mobile agents of `team` currently guarding `anchor`.
#[must_use]
pub fn guard_count(world: &World, team: Team, anchor: AgentId) -> usize {
    world
        .agents()
        .iter()
        .filter(|(_, agent)| {
            agent.team == team
                && agent.state == AgentState::Guarding
                && agent.target == Some(anchor)
        })
        .count()
}
