//! Toroidal world owning both teams, their home bases, and resource deposits.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::agent::{Agent, AgentArena, AgentId, Team};
use crate::behavior::{BehaviorError, Motion, Steering};
use crate::distribute;
use crate::genome::{AgentState, GenomeError, ParameterGenome};
use crate::vector::Vector;

/// Errors that can occur when constructing or stepping a world.
#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("invalid {team} genome: {source}")]
    Genome {
        team: Team,
        #[source]
        source: GenomeError,
    },
    #[error(transparent)]
    Behavior(#[from] BehaviorError),
}

/// Simulation clock (ticks processed since the world was built).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Static configuration for a swarm world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the world in world units.
    pub world_width: u32,
    /// Height of the world in world units.
    pub world_height: u32,
    /// Mobile agents per team.
    pub team_size: usize,
    /// Number of resource deposits laid out between the homes.
    pub deposits: usize,
    /// Units initially held by each deposit.
    pub deposit_stash: u32,
    /// Global speed limit shared by every agent.
    pub max_velocity: f64,
    /// Radius of the circle each team spawns on around its home.
    pub spawn_radius: f64,
    pub ally_home: Vector,
    pub enemy_home: Vector,
    /// Deposits lie on `y = slope * x + intercept` for `x` in `[0, length]`, endpoints excluded.
    pub deposit_slope: f64,
    pub deposit_intercept: f64,
    pub deposit_length: f64,
    /// Tick budget for one simulation run.
    pub maximum_time: u64,
    /// Optional RNG seed for reproducible spawn velocities.
    pub rng_seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_width: 3_000,
            world_height: 3_000,
            team_size: 10,
            deposits: 10,
            deposit_stash: 50,
            max_velocity: 10.0,
            spawn_radius: 100.0,
            ally_home: Vector::new(750.0, 750.0),
            enemy_home: Vector::new(2_250.0, 2_250.0),
            deposit_slope: -1.0,
            deposit_intercept: 3_000.0,
            deposit_length: 3_000.0,
            maximum_time: 2_000,
            rng_seed: None,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.world_width == 0 || self.world_height == 0 {
            return Err(WorldError::InvalidConfig(
                "world dimensions must be non-zero",
            ));
        }
        if !(self.max_velocity.is_finite() && self.max_velocity > 0.0) {
            return Err(WorldError::InvalidConfig("max_velocity must be positive"));
        }
        if !(self.spawn_radius.is_finite() && self.spawn_radius >= 0.0) {
            return Err(WorldError::InvalidConfig(
                "spawn_radius must be non-negative",
            ));
        }
        if !(self.deposit_length.is_finite() && self.deposit_length >= 0.0) {
            return Err(WorldError::InvalidConfig(
                "deposit_length must be non-negative",
            ));
        }
        if !(self.contains(self.ally_home) && self.contains(self.enemy_home)) {
            return Err(WorldError::InvalidConfig(
                "home positions must lie inside the world",
            ));
        }
        let deposits = distribute::linear_interior(
            self.deposits,
            self.deposit_length,
            self.deposit_slope,
            self.deposit_intercept,
        );
        if !deposits.into_iter().all(|point| self.contains(point)) {
            return Err(WorldError::InvalidConfig(
                "deposits must lie inside the world",
            ));
        }
        Ok(())
    }

    /// Whether `point` lies in `[0, width) x [0, height)`.
    fn contains(&self, point: Vector) -> bool {
        (0.0..f64::from(self.world_width)).contains(&point.x)
            && (0.0..f64::from(self.world_height)).contains(&point.y)
    }

    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Stash counts: both homes first, then each deposit in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldStatus {
    pub ally_home: u32,
    pub enemy_home: u32,
    pub deposits: Vec<u32>,
}

impl WorldStatus {
    /// Flattened `(ally_home, enemy_home, deposits...)` tuple.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u32> {
        let mut counts = Vec::with_capacity(self.deposits.len() + 2);
        counts.push(self.ally_home);
        counts.push(self.enemy_home);
        counts.extend_from_slice(&self.deposits);
        counts
    }
}

/// Owns every agent for the duration of one simulation run.
pub struct World {
    config: WorldConfig,
    time: Tick,
    agents: AgentArena,
    ally_home: AgentId,
    enemy_home: AgentId,
    resources: Vec<AgentId>,
    ally_genome: ParameterGenome,
    enemy_genome: ParameterGenome,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("size", &self.size())
            .field("time", &self.time)
            .field("agent_count", &self.agents.len())
            .field("deposits", &self.resources.len())
            .finish()
    }
}

impl World {
    /// Build a world with both teams spawned around their homes.
    pub fn new(
        config: WorldConfig,
        ally_genome: ParameterGenome,
        enemy_genome: ParameterGenome,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let mut mobiles = Vec::with_capacity(config.team_size * 2);
        for (team, center) in [(Team::Ally, config.ally_home), (Team::Enemy, config.enemy_home)] {
            let points = distribute::circular(config.team_size, center, config.spawn_radius);
            for (idx, position) in points.into_iter().enumerate() {
                let velocity = Vector::random(&mut rng, config.max_velocity);
                let name = format!("{}{:02}", team.label(), idx + 1);
                mobiles.push(Agent::mobile(name, team, position, velocity));
            }
        }
        Self::with_agents(config, ally_genome, enemy_genome, mobiles)
    }

    /// Build a world around a caller-supplied set of mobile agents.
    ///
    /// Agents are registered first, then the two homes, then the deposits.
    pub fn with_agents(
        config: WorldConfig,
        ally_genome: ParameterGenome,
        enemy_genome: ParameterGenome,
        agents: Vec<Agent>,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        ally_genome.validate().map_err(|source| WorldError::Genome {
            team: Team::Ally,
            source,
        })?;
        enemy_genome.validate().map_err(|source| WorldError::Genome {
            team: Team::Enemy,
            source,
        })?;

        let mut arena = AgentArena::with_capacity(agents.len() + config.deposits + 2);
        for agent in agents {
            arena.insert(agent);
        }
        let ally_home = arena.insert(Agent::anchor("ally_home", Team::Ally, config.ally_home, 0));
        let enemy_home =
            arena.insert(Agent::anchor("enemy_home", Team::Enemy, config.enemy_home, 0));

        let points = distribute::linear_interior(
            config.deposits,
            config.deposit_length,
            config.deposit_slope,
            config.deposit_intercept,
        );
        let resources = points
            .into_iter()
            .enumerate()
            .map(|(idx, position)| {
                let deposit = Agent::anchor(
                    format!("mineral{:02}", idx + 1),
                    Team::Ally,
                    position,
                    config.deposit_stash,
                );
                arena.insert(deposit)
            })
            .collect::<Vec<_>>();

        debug!(
            agents = arena.len(),
            deposits = resources.len(),
            width = config.world_width,
            height = config.world_height,
            "world constructed"
        );

        Ok(Self {
            config,
            time: Tick::zero(),
            agents: arena,
            ally_home,
            enemy_home,
            resources,
            ally_genome,
            enemy_genome,
        })
    }

    /// Compute every agent's next motion from one snapshot, then commit them
    /// together and advance the clock by one.
    ///
    /// A behavior configuration error aborts the tick before anything is committed.
    pub fn tick(&mut self) -> Result<Tick, WorldError> {
        let (width, height) = self.size();
        let max_velocity = self.config.max_velocity;
        let snapshot = &self.agents;

        let motions = (0..snapshot.len())
            .map(|index| -> Result<Option<Motion>, BehaviorError> {
                let agent = &snapshot.as_slice()[index];
                if agent.is_anchor() {
                    return Ok(None);
                }
                let genome = self.genome(agent.team);
                let Some(steering) = Steering::new(snapshot, index, genome, max_velocity) else {
                    return Ok(None);
                };
                steering.next_motion(width, height).map(Some)
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (agent, motion) in self.agents.as_mut_slice().iter_mut().zip(motions) {
            if let Some(motion) = motion {
                agent.velocity = motion.velocity;
                agent.position = motion.position;
            }
        }

        self.time = self.time.next();
        Ok(self.time)
    }

    /// Stash counts of homes and deposits; no side effects.
    #[must_use]
    pub fn status(&self) -> WorldStatus {
        let stash = |id: AgentId| self.agents.get(id).and_then(Agent::stash).unwrap_or(0);
        WorldStatus {
            ally_home: stash(self.ally_home),
            enemy_home: stash(self.enemy_home),
            deposits: self.resources.iter().map(|id| stash(*id)).collect(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Width and height as floating point extents.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (
            f64::from(self.config.world_width),
            f64::from(self.config.world_height),
        )
    }

    #[must_use]
    pub const fn time(&self) -> Tick {
        self.time
    }

    #[must_use]
    pub fn agents(&self) -> &AgentArena {
        &self.agents
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Genome steering the given team.
    #[must_use]
    pub fn genome(&self, team: Team) -> &ParameterGenome {
        match team {
            Team::Ally => &self.ally_genome,
            Team::Enemy => &self.enemy_genome,
        }
    }

    /// Home anchor of the given team.
    #[must_use]
    pub const fn home(&self, team: Team) -> AgentId {
        match team {
            Team::Ally => self.ally_home,
            Team::Enemy => self.enemy_home,
        }
    }

    #[must_use]
    pub fn resources(&self) -> &[AgentId] {
        &self.resources
    }

    /// Assign a new state and target to a mobile agent. Returns false for
    /// unknown handles and anchors.
    pub fn assign(&mut self, id: AgentId, state: AgentState, target: Option<AgentId>) -> bool {
        match self.agents.get_mut(id) {
            Some(agent) if !agent.is_anchor() => {
                agent.state = state;
                agent.target = target;
                true
            }
            _ => false,
        }
    }

    /// Remove one unit from an anchor's stash, returning whether one was available.
    pub fn withdraw(&mut self, anchor: AgentId) -> bool {
        match self.agents.get_mut(anchor).and_then(Agent::stash_mut) {
            Some(stash) if *stash > 0 => {
                *stash -= 1;
                true
            }
            _ => false,
        }
    }

    /// Add one unit to an anchor's stash.
    pub fn deposit(&mut self, anchor: AgentId) -> bool {
        match self.agents.get_mut(anchor).and_then(Agent::stash_mut) {
            Some(stash) => {
                *stash = stash.saturating_add(1);
                true
            }
            None => false,
        }
    }
}
