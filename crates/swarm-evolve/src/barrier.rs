//! Full-generation synchronization between scoring and evolution.

use std::collections::BTreeMap;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::evolver::Evolver;
use crate::runner::{SimulationRunner, SimulationTask};
use crate::store::{GenerationStats, PopulationStore};
use crate::{EvolveError, Generation};

/// Outstanding simulations of one generation.
///
/// Completed results are persisted exactly once; the barrier only releases
/// after every individual has a recorded fitness.
#[derive(Debug)]
pub struct GenerationBarrier {
    generation: Generation,
    pending: BTreeMap<usize, SimulationTask>,
    deadline: Instant,
}

impl GenerationBarrier {
    /// Submit every unscored individual of `generation` to `runner`.
    ///
    /// Individuals that already carry a fitness record are not resubmitted.
    pub fn submit<S, R>(
        store: &S,
        runner: &R,
        generation: Generation,
        popsize: usize,
        run: &RunConfig,
    ) -> Result<Self, EvolveError>
    where
        S: PopulationStore,
        R: SimulationRunner,
    {
        let mut pending = BTreeMap::new();
        for index in 0..popsize {
            if store.read_fitness(generation, index)?.is_some() {
                continue;
            }
            let path = store.genome_path(generation, index);
            pending.insert(index, runner.submit(&path));
        }
        debug!(generation, outstanding = pending.len(), "generation submitted");
        Ok(Self {
            generation,
            pending,
            deadline: Instant::now() + run.timeout,
        })
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Poll every `wait` until all results are persisted or the deadline passes.
    pub async fn wait<S: PopulationStore>(
        mut self,
        store: &S,
        run: &RunConfig,
    ) -> Result<(), EvolveError> {
        loop {
            let ready: Vec<usize> = self
                .pending
                .iter()
                .filter(|(_, task)| task.is_ready())
                .map(|(index, _)| *index)
                .collect();
            for index in ready {
                let Some(task) = self.pending.remove(&index) else {
                    continue;
                };
                let record = match task.result().await {
                    Ok(record) => record,
                    Err(err) => {
                        warn!(
                            generation = self.generation,
                            index,
                            error = %err,
                            "simulation rejected"
                        );
                        self.abort_all();
                        return Err(err);
                    }
                };
                if let Err(err) = store.write_fitness(self.generation, index, &record) {
                    warn!(
                        generation = self.generation,
                        index,
                        error = %err,
                        "fitness record not persisted"
                    );
                    self.abort_all();
                    return Err(err);
                }
                debug!(
                    generation = self.generation,
                    index,
                    fitness = record.fitness(),
                    "fitness recorded"
                );
            }

            let Some(&first) = self.pending.keys().next() else {
                return Ok(());
            };
            if Instant::now() >= self.deadline {
                warn!(
                    generation = self.generation,
                    outstanding = self.pending.len(),
                    "generation timed out"
                );
                self.abort_all();
                return Err(EvolveError::Timeout {
                    generation: self.generation,
                    index: first,
                });
            }
            sleep(run.wait).await;
        }
    }

    fn abort_all(&mut self) {
        for task in self.pending.values() {
            task.abort();
        }
        self.pending.clear();
    }
}

/// Score and evolve generations `start..` until `count` generations have
/// evolved or `max_generations` is reached, initializing generation 0 when absent.
pub async fn run_generations<S, R>(
    evolver: &mut Evolver<S>,
    runner: &R,
    run: &RunConfig,
    start: Generation,
    count: u32,
) -> Result<Vec<GenerationStats>, EvolveError>
where
    S: PopulationStore,
    R: SimulationRunner,
{
    run.validate()?;
    if start == 0 && !evolver.has_population(0) {
        evolver.initialize_population()?;
    }

    let last = start
        .saturating_add(count)
        .min(evolver.config().max_generations);
    let popsize = evolver.config().popsize;
    let mut history = Vec::new();
    for generation in start..last {
        let barrier = GenerationBarrier::submit(evolver.store(), runner, generation, popsize, run)?;
        barrier.wait(evolver.store(), run).await?;
        let stats = evolver.evolve(generation)?;
        history.push(stats);
    }
    info!(start, evolved = history.len(), "run finished");
    Ok(history)
}
