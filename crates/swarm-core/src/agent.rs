//! Agents, anchors, and the dense arena that owns them.

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::fmt;

use crate::genome::AgentState;
use crate::vector::Vector;

new_key_type! {
    /// Stable handle for agents backed by a generational slot map.
    pub struct AgentId;
}

/// Team membership.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Ally,
    Enemy,
}

impl Team {
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Ally => Self::Enemy,
            Self::Enemy => Self::Ally,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ally => "ally",
            Self::Enemy => "enemy",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Distinguishes behavior-driven agents from stationary stash holders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentKind {
    Mobile,
    /// Home base or resource deposit holding a stash of units.
    Anchor { stash: u32 },
}

/// A single entity in the world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub position: Vector,
    pub velocity: Vector,
    pub name: String,
    pub team: Team,
    pub state: AgentState,
    /// Non-owning handle of the agent this one is seeking or homing to.
    pub target: Option<AgentId>,
    pub kind: AgentKind,
}

impl Agent {
    /// Construct a mobile agent in the spreading state.
    #[must_use]
    pub fn mobile(name: impl Into<String>, team: Team, position: Vector, velocity: Vector) -> Self {
        Self {
            position,
            velocity,
            name: name.into(),
            team,
            state: AgentState::default(),
            target: None,
            kind: AgentKind::Mobile,
        }
    }

    /// Construct a stationary anchor with an initial stash.
    #[must_use]
    pub fn anchor(name: impl Into<String>, team: Team, position: Vector, stash: u32) -> Self {
        Self {
            position,
            velocity: Vector::zero(),
            name: name.into(),
            team,
            state: AgentState::default(),
            target: None,
            kind: AgentKind::Anchor { stash },
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: AgentState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: AgentId) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub const fn is_anchor(&self) -> bool {
        matches!(self.kind, AgentKind::Anchor { .. })
    }

    /// Stash count for anchors, `None` for mobile agents.
    #[must_use]
    pub const fn stash(&self) -> Option<u32> {
        match self.kind {
            AgentKind::Anchor { stash } => Some(stash),
            AgentKind::Mobile => None,
        }
    }

    pub(crate) fn stash_mut(&mut self) -> Option<&mut u32> {
        match &mut self.kind {
            AgentKind::Anchor { stash } => Some(stash),
            AgentKind::Mobile => None,
        }
    }
}

/// Dense agent storage with generational handles, iterated in registration order.
#[derive(Debug, Clone)]
pub struct AgentArena {
    slots: SlotMap<AgentId, usize>,
    handles: Vec<AgentId>,
    agents: Vec<Agent>,
}

impl Default for AgentArena {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            handles: Vec::new(),
            agents: Vec::new(),
        }
    }

    /// Create an arena with reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            handles: Vec::with_capacity(capacity),
            agents: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Insert a new agent and return its handle.
    pub fn insert(&mut self, agent: Agent) -> AgentId {
        let index = self.agents.len();
        self.agents.push(agent);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    /// Returns the dense index for `id`, if present.
    #[must_use]
    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.slots.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index_of(id).map(|index| &self.agents[index])
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let index = self.index_of(id)?;
        self.agents.get_mut(index)
    }

    /// Handle stored at dense position `index`.
    #[must_use]
    pub fn handle_at(&self, index: usize) -> Option<AgentId> {
        self.handles.get(index).copied()
    }

    /// Iterate over handles in dense order.
    pub fn iter_handles(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.handles.iter().copied()
    }

    /// Iterate over `(handle, agent)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.handles.iter().copied().zip(self.agents.iter())
    }

    /// Dense slice of agents in registration order.
    #[must_use]
    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seed: u32) -> Agent {
        Agent::mobile(
            format!("ally{seed:02}"),
            Team::Ally,
            Vector::new(f64::from(seed), f64::from(seed) + 1.0),
            Vector::new(1.0, 0.0),
        )
    }

    #[test]
    fn insert_allocates_unique_handles() {
        let mut arena = AgentArena::new();
        let a = arena.insert(sample(0));
        let b = arena.insert(sample(1));
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.index_of(b), Some(1));
        assert_eq!(arena.get(a).map(|agent| agent.name.as_str()), Some("ally00"));
        assert_eq!(arena.handle_at(1), Some(b));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut arena = AgentArena::with_capacity(4);
        let ids: Vec<_> = (0..4).map(|seed| arena.insert(sample(seed))).collect();
        let seen: Vec<_> = arena.iter_handles().collect();
        assert_eq!(ids, seen);
    }

    #[test]
    fn anchors_carry_stash() {
        let home = Agent::anchor("ally_home", Team::Ally, Vector::new(1.0, 1.0), 3);
        assert!(home.is_anchor());
        assert_eq!(home.stash(), Some(3));
        assert_eq!(sample(0).stash(), None);
        assert_eq!(Team::Ally.opponent(), Team::Enemy);
    }
}
