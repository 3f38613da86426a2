//! Shared configuration loading for the `swarm-evolver` binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use swarm_core::{HarvestConfig, ParameterGenome, WorldConfig};
use swarm_evolve::{Cancellation, EvolverConfig, SimulationOutcome, read_genome_file, simulate};

/// Settings file contents; every section falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub harvest: HarvestConfig,
    pub evolver: EvolverConfig,
}

impl AppConfig {
    /// Read a JSON settings file, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.world.validate().context("invalid world configuration")?;
        config
            .evolver
            .validate()
            .context("invalid evolver configuration")?;
        Ok(config)
    }
}

/// Simulate a single genome record against the default opponent.
pub fn simulate_genome(config: &AppConfig, genome: &Path) -> Result<SimulationOutcome> {
    let genome = read_genome_file(genome)
        .with_context(|| format!("failed to load genome {}", genome.display()))?;
    simulate(
        genome,
        ParameterGenome::default(),
        &config.world,
        config.harvest,
        &Cancellation::new(),
    )
    .context("simulation aborted")
}
