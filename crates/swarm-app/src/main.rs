use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use swarm_app::{AppConfig, simulate_genome};
use swarm_evolve::{Evolver, FsPopulationStore, LocalRunner, RunConfig, run_generations};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "swarm-evolver",
    version,
    about = "Evolve swarm behavior parameters through repeated simulation"
)]
struct Cli {
    /// JSON settings file with optional `world`, `harvest`, and `evolver` sections.
    #[arg(long, global = true, env = "SWARM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create generation 0 with uniformly random genomes.
    Initpop {
        /// Population directory.
        dir: PathBuf,
    },
    /// Evolve a fully scored generation into the next one.
    Evolve {
        #[arg(long, default_value = "population")]
        dir: PathBuf,
        /// Generation whose fitness records are complete.
        generation: u32,
    },
    /// Score and evolve generations until the limit is reached.
    Run {
        /// Generations to evolve (defaults to the configured maximum).
        #[arg(long)]
        generations: Option<u32>,
        #[arg(long, default_value = "population")]
        dir: PathBuf,
        /// Generation to resume from.
        #[arg(long, default_value_t = 0)]
        start: u32,
        /// Seconds between completion polls.
        #[arg(long, default_value_t = 1.0)]
        wait_seconds: f64,
        /// Seconds a generation may stay outstanding before the run aborts.
        #[arg(long, default_value_t = 3600.0)]
        timeout_seconds: f64,
    },
    /// Run one genome to the time budget and print the final stash counts.
    Simulate {
        /// Genome record to simulate.
        genome: PathBuf,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Initpop { dir } => {
            let mut evolver = open_evolver(&config, dir.clone())?;
            let population = evolver.initialize_population()?;
            info!(dir = %dir.display(), count = population.len(), "population ready");
        }
        Command::Evolve { dir, generation } => {
            let mut evolver = open_evolver(&config, dir)?;
            let stats = evolver
                .evolve(generation)
                .with_context(|| format!("failed to evolve generation {generation}"))?;
            println!("Best: {} Median: {}", stats.best, stats.median);
        }
        Command::Run {
            generations,
            dir,
            start,
            wait_seconds,
            timeout_seconds,
        } => {
            let run = RunConfig {
                wait: seconds(wait_seconds, "--wait-seconds")?,
                timeout: seconds(timeout_seconds, "--timeout-seconds")?,
            };
            let count = generations.unwrap_or(config.evolver.max_generations);
            let runner = LocalRunner::new(config.world.clone(), config.harvest);
            let mut evolver = open_evolver(&config, dir)?;
            let history = run_generations(&mut evolver, &runner, &run, start, count).await?;
            for (offset, stats) in history.iter().enumerate() {
                println!(
                    "Generation {}: Best: {} Median: {}",
                    start as usize + offset,
                    stats.best,
                    stats.median
                );
            }
        }
        Command::Simulate { genome } => {
            let outcome = simulate_genome(&config, &genome)?;
            info!(ticks = outcome.ticks, fitness = outcome.fitness(), "simulation complete");
            println!("{:?}", outcome.status.to_vec());
        }
    }

    Ok(())
}

fn open_evolver(config: &AppConfig, dir: PathBuf) -> Result<Evolver<FsPopulationStore>> {
    let store = FsPopulationStore::open(&dir, config.evolver.popsize)
        .with_context(|| format!("failed to open population directory {}", dir.display()))?;
    Evolver::new(config.evolver.clone(), store).context("invalid evolver configuration")
}

fn seconds(value: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("{flag} must be a non-negative number"))
}
