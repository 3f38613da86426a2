use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use swarm_core::{HarvestConfig, ParameterGenome, Vector, WorldConfig};
use swarm_evolve::{
    EvolveError, Evolver, EvolverConfig, FitnessRecord, FsPopulationStore, Generation,
    GenerationBarrier, GenerationStats, LocalRunner, PopulationStore, RunConfig, SimulationRunner,
    SimulationTask, run_generations,
};

fn evolver_config(popsize: usize, seed: u64) -> EvolverConfig {
    EvolverConfig {
        popsize,
        rng_seed: Some(seed),
        ..EvolverConfig::default()
    }
}

fn open(dir: &Path, popsize: usize, seed: u64) -> Evolver<FsPopulationStore> {
    let store = FsPopulationStore::open(dir, popsize).expect("store");
    Evolver::new(evolver_config(popsize, seed), store).expect("evolver")
}

fn score(store: &FsPopulationStore, generation: u32, fitness: &[i64]) {
    for (index, value) in fitness.iter().enumerate() {
        let record = FitnessRecord::new(store.genome_path(generation, index), *value);
        store
            .write_fitness(generation, index, &record)
            .expect("write fitness");
    }
}

#[test]
fn scenario_reports_best_and_median_and_keeps_elite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 4, 7);
    evolver.initialize_population().expect("init");
    score(evolver.store(), 0, &[10, 40, 25, 5]);

    let stats = evolver.evolve(0).expect("evolve");
    assert_eq!(stats, GenerationStats { best: 40, median: 10 });
    assert_eq!(evolver.store().read_stats(0).expect("stats"), Some(stats));

    let elite = evolver.store().read_genome(0, 1).expect("elite");
    assert_eq!(evolver.store().read_genome(1, 0).expect("slot 0"), elite);
    for index in 0..4 {
        assert!(evolver.store().has_genome(1, index));
    }
}

#[test]
fn evolve_refuses_partially_scored_generation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 4, 1);
    evolver.initialize_population().expect("init");
    score(evolver.store(), 0, &[1, 2, 3]);

    let err = evolver.evolve(0).expect_err("missing fitness");
    assert!(matches!(
        err,
        EvolveError::MissingFitness {
            generation: 0,
            index: 3
        }
    ));
    assert!(!evolver.store().has_genome(1, 0));
    assert_eq!(evolver.store().read_stats(0).expect("stats"), None);
}

#[test]
fn evolve_refuses_to_overwrite_existing_successor() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 4, 3);
    evolver.initialize_population().expect("init");
    score(evolver.store(), 0, &[2, 8, 6, 4]);
    evolver.evolve(0).expect("first evolve");
    let before: Vec<_> = (0..4)
        .map(|index| evolver.store().read_genome(1, index).expect("genome"))
        .collect();

    let err = evolver.evolve(0).expect_err("successor exists");
    assert!(matches!(err, EvolveError::GenerationExists { generation: 1 }));
    let after: Vec<_> = (0..4)
        .map(|index| evolver.store().read_genome(1, index).expect("genome"))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn same_seed_same_inputs_same_offspring() {
    let run = |dir: &Path| {
        let mut evolver = open(dir, 6, 99);
        evolver.initialize_population().expect("init");
        score(evolver.store(), 0, &[3, 1, 4, 1, 5, 9]);
        evolver.evolve(0).expect("evolve");
        (0..6)
            .map(|index| evolver.store().read_genome(1, index).expect("genome"))
            .collect::<Vec<_>>()
    };
    let a = tempfile::tempdir().expect("tempdir");
    let b = tempfile::tempdir().expect("tempdir");
    assert_eq!(run(a.path()), run(b.path()));
}

#[test]
fn genomes_stay_in_range_across_many_generations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 5, 1234);
    evolver.initialize_population().expect("init");
    for generation in 0..25 {
        let fitness: Vec<i64> = (0..5).map(|i| (i * 7 + generation as i64) % 5).collect();
        score(evolver.store(), generation, &fitness);
        evolver.evolve(generation).expect("evolve");
        for index in 0..5 {
            let genome = evolver
                .store()
                .read_genome(generation + 1, index)
                .expect("genome");
            genome.validate().expect("bounded genome");
        }
    }
}

/// Never finishes.
struct StalledRunner;

impl SimulationRunner for StalledRunner {
    fn submit(&self, _genome_path: &Path) -> SimulationTask {
        SimulationTask::from_handle(tokio::spawn(std::future::pending()))
    }
}

/// Scores each submission with an increasing counter.
#[derive(Default)]
struct CountingRunner {
    next: AtomicI64,
}

impl SimulationRunner for CountingRunner {
    fn submit(&self, genome_path: &Path) -> SimulationTask {
        let fitness = self.next.fetch_add(1, Ordering::SeqCst);
        let record = FitnessRecord::new(genome_path, fitness);
        SimulationTask::from_handle(tokio::spawn(async move { Ok(record) }))
    }
}

/// Finishes the first `instant` submissions immediately; every later one is a
/// blocking job that spins until its cancellation flag is set and reports
/// whether it saw the flag.
struct BlockingRunner {
    instant: usize,
    submitted: AtomicUsize,
    observed: mpsc::Sender<bool>,
}

impl BlockingRunner {
    fn new(instant: usize) -> (Self, mpsc::Receiver<bool>) {
        let (observed, rx) = mpsc::channel();
        let runner = Self {
            instant,
            submitted: AtomicUsize::new(0),
            observed,
        };
        (runner, rx)
    }
}

impl SimulationRunner for BlockingRunner {
    fn submit(&self, genome_path: &Path) -> SimulationTask {
        let record = FitnessRecord::new(genome_path, 1);
        if self.submitted.fetch_add(1, Ordering::SeqCst) < self.instant {
            return SimulationTask::from_handle(tokio::spawn(async move { Ok(record) }));
        }
        let observed = self.observed.clone();
        SimulationTask::spawn_blocking(move |cancel| {
            let started = Instant::now();
            while started.elapsed() < Duration::from_secs(10) {
                if cancel.is_cancelled() {
                    let _ = observed.send(true);
                    return Err(EvolveError::Cancelled { tick: 0 });
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            let _ = observed.send(false);
            Ok(record)
        })
    }
}

/// Delegates to a filesystem store but cannot persist fitness records.
struct ReadOnlyFitnessStore(FsPopulationStore);

impl PopulationStore for ReadOnlyFitnessStore {
    fn genome_path(&self, generation: Generation, index: usize) -> PathBuf {
        self.0.genome_path(generation, index)
    }

    fn has_genome(&self, generation: Generation, index: usize) -> bool {
        self.0.has_genome(generation, index)
    }

    fn write_genome(
        &self,
        generation: Generation,
        index: usize,
        genome: &ParameterGenome,
    ) -> Result<(), EvolveError> {
        self.0.write_genome(generation, index, genome)
    }

    fn read_genome(
        &self,
        generation: Generation,
        index: usize,
    ) -> Result<ParameterGenome, EvolveError> {
        self.0.read_genome(generation, index)
    }

    fn write_fitness(
        &self,
        generation: Generation,
        index: usize,
        _record: &FitnessRecord,
    ) -> Result<(), EvolveError> {
        Err(EvolveError::Io {
            path: self.0.fitness_path(generation, index),
            source: std::io::Error::other("read-only"),
        })
    }

    fn read_fitness(
        &self,
        generation: Generation,
        index: usize,
    ) -> Result<Option<i64>, EvolveError> {
        self.0.read_fitness(generation, index)
    }

    fn write_stats(
        &self,
        generation: Generation,
        stats: &GenerationStats,
    ) -> Result<(), EvolveError> {
        self.0.write_stats(generation, stats)
    }

    fn read_stats(&self, generation: Generation) -> Result<Option<GenerationStats>, EvolveError> {
        self.0.read_stats(generation)
    }
}

#[tokio::test]
async fn barrier_timeout_cancels_blocking_simulations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 2, 5);
    evolver.initialize_population().expect("init");
    let (runner, observed) = BlockingRunner::new(0);
    let run = RunConfig {
        wait: Duration::from_millis(20),
        timeout: Duration::from_millis(200),
    };

    let barrier = GenerationBarrier::submit(evolver.store(), &runner, 0, 2, &run).expect("submit");
    let err = barrier
        .wait(evolver.store(), &run)
        .await
        .expect_err("timeout");
    assert!(matches!(err, EvolveError::Timeout { generation: 0, .. }));
    for _ in 0..2 {
        let cancelled = observed
            .recv_timeout(Duration::from_secs(2))
            .expect("blocking job returned");
        assert!(cancelled, "blocking job ran past the timeout");
    }
}

#[tokio::test]
async fn failed_fitness_write_cancels_remaining_simulations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsPopulationStore::open(dir.path(), 2).expect("store");
    let mut evolver =
        Evolver::new(evolver_config(2, 5), ReadOnlyFitnessStore(store)).expect("evolver");
    evolver.initialize_population().expect("init");
    let (runner, observed) = BlockingRunner::new(1);
    let run = RunConfig {
        wait: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    };

    let barrier = GenerationBarrier::submit(evolver.store(), &runner, 0, 2, &run).expect("submit");
    let err = barrier
        .wait(evolver.store(), &run)
        .await
        .expect_err("write failure");
    assert!(matches!(err, EvolveError::Io { .. }));
    let cancelled = observed
        .recv_timeout(Duration::from_secs(2))
        .expect("blocking job returned");
    assert!(cancelled, "blocking job outlived the failed generation");
}

#[tokio::test(start_paused = true)]
async fn barrier_times_out_on_stalled_individual() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 3, 5);
    evolver.initialize_population().expect("init");
    let run = RunConfig {
        wait: Duration::from_secs(1),
        timeout: Duration::from_secs(5),
    };

    let barrier = GenerationBarrier::submit(evolver.store(), &StalledRunner, 0, 3, &run)
        .expect("submit");
    assert_eq!(barrier.outstanding(), 3);
    let err = barrier
        .wait(evolver.store(), &run)
        .await
        .expect_err("timeout");
    assert!(matches!(
        err,
        EvolveError::Timeout {
            generation: 0,
            index: 0
        }
    ));
    assert_eq!(evolver.store().read_fitness(0, 0).expect("read"), None);
}

#[tokio::test(start_paused = true)]
async fn barrier_skips_already_scored_individuals() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 3, 5);
    evolver.initialize_population().expect("init");
    let record = FitnessRecord::new(evolver.store().genome_path(0, 1), 77);
    evolver
        .store()
        .write_fitness(0, 1, &record)
        .expect("fitness");

    let runner = CountingRunner::default();
    let run = RunConfig {
        wait: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    };
    let barrier =
        GenerationBarrier::submit(evolver.store(), &runner, 0, 3, &run).expect("submit");
    assert_eq!(barrier.outstanding(), 2);
    barrier.wait(evolver.store(), &run).await.expect("wait");

    let store = evolver.store();
    assert_eq!(store.read_fitness(0, 0).expect("read"), Some(0));
    assert_eq!(store.read_fitness(0, 1).expect("read"), Some(77));
    assert_eq!(store.read_fitness(0, 2).expect("read"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn run_loop_advances_whole_generations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 4, 21);
    let runner = CountingRunner::default();
    let run = RunConfig {
        wait: Duration::from_millis(10),
        timeout: Duration::from_secs(60),
    };

    let history = run_generations(&mut evolver, &runner, &run, 0, 2)
        .await
        .expect("run");
    assert_eq!(history.len(), 2);
    // Generation 0 is scored 0..4, generation 1 is scored 4..8.
    assert_eq!(history[0], GenerationStats { best: 3, median: 1 });
    assert_eq!(history[1], GenerationStats { best: 7, median: 5 });
    for index in 0..4 {
        assert!(evolver.store().has_genome(2, index));
    }
}

#[tokio::test]
async fn local_runner_drives_a_real_generation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut evolver = open(dir.path(), 3, 8);
    let world = WorldConfig {
        world_width: 300,
        world_height: 300,
        team_size: 2,
        deposits: 2,
        deposit_stash: 2,
        spawn_radius: 10.0,
        ally_home: Vector::new(75.0, 75.0),
        enemy_home: Vector::new(225.0, 225.0),
        deposit_intercept: 300.0,
        deposit_length: 300.0,
        maximum_time: 20,
        rng_seed: Some(4),
        ..WorldConfig::default()
    };
    let runner = LocalRunner::new(world, HarvestConfig::default());
    let run = RunConfig {
        wait: Duration::from_millis(5),
        timeout: Duration::from_secs(120),
    };

    let history = run_generations(&mut evolver, &runner, &run, 0, 1)
        .await
        .expect("run");
    assert_eq!(history.len(), 1);
    assert!(history[0].best >= history[0].median);
    for index in 0..3 {
        assert!(evolver.store().read_fitness(0, index).expect("read").is_some());
    }
}
