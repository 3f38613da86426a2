//! Generational evolution of swarm parameter genomes.
//!
//! A population lives in a [`PopulationStore`], is scored by a
//! [`SimulationRunner`], and advances one generation at a time through
//! [`Evolver::evolve`] once the [`GenerationBarrier`] has collected every fitness.

use std::path::PathBuf;
use swarm_core::{GenomeError, WorldError};
use thiserror::Error;

pub mod barrier;
pub mod config;
pub mod evolver;
pub mod runner;
pub mod store;

pub use barrier::{GenerationBarrier, run_generations};
pub use config::{EvolverConfig, RunConfig};
pub use evolver::{Evolver, Individual, tournament};
pub use runner::{
    Cancellation, LocalRunner, SimulationOutcome, SimulationRunner, SimulationTask, simulate,
};
pub use store::{
    FitnessRecord, FsPopulationStore, GenerationStats, PopulationStore, SimulationResult,
    index_width, read_genome_file,
};

/// Generation counter used to address population records.
pub type Generation = u32;

/// Errors raised while evolving, persisting, or scoring a population.
#[derive(Debug, Error)]
pub enum EvolveError {
    #[error("invalid evolver configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("generation {generation} individual {index} has no recorded fitness")]
    MissingFitness { generation: Generation, index: usize },
    #[error("generation {generation} individual {index} did not finish before the deadline")]
    Timeout { generation: Generation, index: usize },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Genome(#[from] GenomeError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("simulation cancelled at tick {tick}")]
    Cancelled { tick: u64 },
    #[error("generation {generation} already exists; refusing to overwrite it")]
    GenerationExists { generation: Generation },
    #[error("simulation runner error: {0}")]
    Runner(String),
}
