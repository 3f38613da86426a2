//! Elitist tournament evolution over a fixed-size population.

use rand::{Rng, RngCore, rngs::SmallRng};
use swarm_core::ParameterGenome;
use tracing::{debug, info};

use crate::config::EvolverConfig;
use crate::store::{GenerationStats, PopulationStore};
use crate::{EvolveError, Generation};

/// One genome of a generation together with its score, once known.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub generation: Generation,
    pub index: usize,
    pub genome: ParameterGenome,
    pub fitness: Option<i64>,
}

/// Index of the fittest of `size` uniform draws with replacement.
///
/// Equal fitness keeps the earlier draw.
pub fn tournament(fitness: &[i64], size: usize, rng: &mut dyn RngCore) -> Option<usize> {
    if fitness.is_empty() {
        return None;
    }
    let mut winner: Option<usize> = None;
    for _ in 0..size.max(1) {
        let draw = rng.random_range(0..fitness.len());
        match winner {
            Some(best) if fitness[best] >= fitness[draw] => {}
            _ => winner = Some(draw),
        }
    }
    winner
}

/// Drives population initialization and generation-to-generation evolution.
pub struct Evolver<S> {
    config: EvolverConfig,
    store: S,
    rng: SmallRng,
}

impl<S: PopulationStore> Evolver<S> {
    /// Construct an evolver whose randomness derives from `config.rng_seed`.
    pub fn new(config: EvolverConfig, store: S) -> Result<Self, EvolveError> {
        let rng = config.seeded_rng();
        Self::with_rng(config, store, rng)
    }

    /// Construct an evolver around an explicit random source.
    pub fn with_rng(config: EvolverConfig, store: S, rng: SmallRng) -> Result<Self, EvolveError> {
        config.validate()?;
        Ok(Self { config, store, rng })
    }

    #[must_use]
    pub fn config(&self) -> &EvolverConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// True once every genome of `generation` has been persisted.
    #[must_use]
    pub fn has_population(&self, generation: Generation) -> bool {
        (0..self.config.popsize).all(|index| self.store.has_genome(generation, index))
    }

    /// Generate and persist generation 0 with every field drawn uniformly in range.
    pub fn initialize_population(&mut self) -> Result<Vec<Individual>, EvolveError> {
        let mut population = Vec::with_capacity(self.config.popsize);
        for index in 0..self.config.popsize {
            let genome = ParameterGenome::random(&mut self.rng);
            self.store.write_genome(0, index, &genome)?;
            population.push(Individual {
                generation: 0,
                index,
                genome,
                fitness: None,
            });
        }
        info!(popsize = self.config.popsize, "initialized population");
        Ok(population)
    }

    /// Load every individual of `generation`, failing if any fitness is missing.
    pub fn load_scored(&self, generation: Generation) -> Result<Vec<Individual>, EvolveError> {
        (0..self.config.popsize)
            .map(|index| {
                let fitness = self
                    .store
                    .read_fitness(generation, index)?
                    .ok_or(EvolveError::MissingFitness { generation, index })?;
                let genome = self.store.read_genome(generation, index)?;
                Ok(Individual {
                    generation,
                    index,
                    genome,
                    fitness: Some(fitness),
                })
            })
            .collect()
    }

    /// Produce and persist generation `generation + 1`.
    ///
    /// The best individual is carried into slot 0 unmutated; every other slot
    /// is a mutated tournament winner. Nothing is written when any fitness of
    /// `generation` is missing or when any genome of `generation + 1` already
    /// exists.
    pub fn evolve(&mut self, generation: Generation) -> Result<GenerationStats, EvolveError> {
        let mut ranked = self.load_scored(generation)?;
        let successor = generation + 1;
        if (0..ranked.len()).any(|index| self.store.has_genome(successor, index)) {
            return Err(EvolveError::GenerationExists {
                generation: successor,
            });
        }
        ranked.sort_by(|a, b| b.fitness.cmp(&a.fitness));
        let scores: Vec<i64> = ranked.iter().map(|i| i.fitness.unwrap_or(i64::MIN)).collect();

        let stats = GenerationStats {
            best: scores[0],
            median: scores[scores.len() / 2],
        };
        self.store.write_stats(generation, &stats)?;

        let rates = self.config.mutation_rates();
        let mut next = Vec::with_capacity(ranked.len());
        next.push(ranked[0].genome.clone());
        while next.len() < ranked.len() {
            let Some(winner) = tournament(&scores, self.config.tourney_size, &mut self.rng) else {
                break;
            };
            let mut genome = ranked[winner].genome.clone();
            genome.mutate(&mut self.rng, &rates);
            next.push(genome);
        }

        for (index, genome) in next.iter().enumerate() {
            self.store.write_genome(successor, index, genome)?;
            debug!(generation = successor, index, "genome persisted");
        }

        info!(
            generation,
            best = stats.best,
            median = stats.median,
            elite = ranked[0].index,
            "generation evolved"
        );
        Ok(stats)
    }
}
