//! Simulation runner contract and the in-process implementation.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use swarm_core::{HarvestConfig, HarvestPolicy, ParameterGenome, World, WorldConfig, WorldStatus};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::EvolveError;
use crate::store::{FitnessRecord, read_genome_file};

/// Accepts a genome record and asynchronously produces its fitness.
pub trait SimulationRunner {
    fn submit(&self, genome_path: &Path) -> SimulationTask;
}

/// Shared stop flag polled by long-running simulations.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle to one outstanding simulation.
#[derive(Debug)]
pub struct SimulationTask {
    handle: JoinHandle<Result<FitnessRecord, EvolveError>>,
    cancel: Cancellation,
}

impl SimulationTask {
    /// Wrap an async task; it is stopped by aborting its handle.
    #[must_use]
    pub fn from_handle(handle: JoinHandle<Result<FitnessRecord, EvolveError>>) -> Self {
        Self {
            handle,
            cancel: Cancellation::new(),
        }
    }

    /// Run `job` on tokio's blocking pool. Must be called from within a runtime.
    ///
    /// Blocking jobs cannot be aborted once started, so `job` receives the
    /// task's [`Cancellation`] and must return promptly after it is set.
    pub fn spawn_blocking<F>(job: F) -> Self
    where
        F: FnOnce(Cancellation) -> Result<FitnessRecord, EvolveError> + Send + 'static,
    {
        let cancel = Cancellation::new();
        let flag = cancel.clone();
        Self {
            handle: tokio::task::spawn_blocking(move || job(flag)),
            cancel,
        }
    }

    /// Non-blocking completion check.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.handle.is_finished()
    }

    /// Retrieve the fitness record, waiting if the task is still running.
    pub async fn result(self) -> Result<FitnessRecord, EvolveError> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => Err(EvolveError::Runner(err.to_string())),
        }
    }

    /// Signal the job to stop and abort the handle.
    pub fn abort(&self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Final state of one completed simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub ticks: u64,
    pub status: WorldStatus,
}

impl SimulationOutcome {
    /// Units delivered to the ally home.
    #[must_use]
    pub fn fitness(&self) -> i64 {
        i64::from(self.status.ally_home)
    }
}

/// Run one full simulation: harvest, tick, repeat until `maximum_time`.
///
/// `cancel` is checked before every tick.
pub fn simulate(
    genome: ParameterGenome,
    opponent: ParameterGenome,
    world: &WorldConfig,
    harvest: HarvestConfig,
    cancel: &Cancellation,
) -> Result<SimulationOutcome, EvolveError> {
    let mut world = World::new(world.clone(), genome, opponent)?;
    let policy = HarvestPolicy::new(harvest);
    let limit = world.config().maximum_time;
    while world.time().0 < limit {
        if cancel.is_cancelled() {
            return Err(EvolveError::Cancelled {
                tick: world.time().0,
            });
        }
        policy.apply(&mut world);
        world.tick()?;
    }
    Ok(SimulationOutcome {
        ticks: world.time().0,
        status: world.status(),
    })
}

/// Scores genomes in-process on tokio's blocking pool against a fixed opponent.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner {
    world: WorldConfig,
    harvest: HarvestConfig,
    opponent: ParameterGenome,
}

impl LocalRunner {
    #[must_use]
    pub fn new(world: WorldConfig, harvest: HarvestConfig) -> Self {
        Self {
            world,
            harvest,
            opponent: ParameterGenome::default(),
        }
    }

    #[must_use]
    pub fn with_opponent(mut self, opponent: ParameterGenome) -> Self {
        self.opponent = opponent;
        self
    }

    /// Load `genome_path`, simulate it, and build its fitness record.
    pub fn score(
        &self,
        genome_path: &Path,
        cancel: &Cancellation,
    ) -> Result<FitnessRecord, EvolveError> {
        let genome = read_genome_file(genome_path)?;
        let outcome = simulate(
            genome,
            self.opponent.clone(),
            &self.world,
            self.harvest,
            cancel,
        )?;
        let status = serde_json::to_value(&outcome.status).map_err(|source| EvolveError::Json {
            path: genome_path.to_path_buf(),
            source,
        })?;
        debug!(
            genome = %genome_path.display(),
            fitness = outcome.fitness(),
            ticks = outcome.ticks,
            "simulation finished"
        );
        Ok(FitnessRecord::new(genome_path, outcome.fitness())
            .with_detail("ticks", Value::from(outcome.ticks))
            .with_detail("status", status))
    }
}

impl SimulationRunner for LocalRunner {
    fn submit(&self, genome_path: &Path) -> SimulationTask {
        let runner = self.clone();
        let path: PathBuf = genome_path.to_path_buf();
        SimulationTask::spawn_blocking(move |cancel| runner.score(&path, &cancel))
    }
}
