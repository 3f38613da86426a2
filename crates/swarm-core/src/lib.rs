//! Core types for the two-team swarm simulation: vectors, genomes, agents,
//! the weighted-behavior steering engine, and the toroidal world.

pub mod agent;
pub mod behavior;
pub mod distribute;
pub mod genome;
pub mod harvest;
pub mod vector;
pub mod world;

pub use agent::{Agent, AgentArena, AgentId, AgentKind, Team};
pub use behavior::{BehaviorError, Motion, Steering, blend, wrap_axis};
pub use genome::{
    AgentState, BehaviorComponent, BehaviorKind, GenomeError, MutationRates, ParameterGenome,
    StateConfig,
};
pub use harvest::{HarvestConfig, HarvestPolicy, HarvestReport};
pub use vector::Vector;
pub use world::{Tick, World, WorldConfig, WorldError, WorldStatus};
