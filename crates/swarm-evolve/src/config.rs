//! Optimizer and run-loop configuration.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use swarm_core::MutationRates;

use crate::EvolveError;

/// Immutable settings injected into an [`Evolver`](crate::Evolver).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvolverConfig {
    /// Individuals per generation.
    pub popsize: usize,
    /// Generation at which the run loop stops.
    pub max_generations: u32,
    /// Draws per tournament, with replacement.
    pub tourney_size: usize,
    /// Independent per-field mutation probability.
    pub p_mut: f64,
    pub mut_weight: f64,
    pub mut_radius: u32,
    pub mut_alpha: u32,
    /// Optional RNG seed for reproducible initialization and selection.
    pub rng_seed: Option<u64>,
}

impl Default for EvolverConfig {
    fn default() -> Self {
        let rates = MutationRates::default();
        Self {
            popsize: 50,
            max_generations: 999,
            tourney_size: 3,
            p_mut: rates.probability,
            mut_weight: rates.weight,
            mut_radius: rates.radius,
            mut_alpha: rates.alpha,
            rng_seed: None,
        }
    }
}

impl EvolverConfig {
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.popsize == 0 {
            return Err(EvolveError::InvalidConfig("popsize must be at least 1"));
        }
        if self.tourney_size == 0 {
            return Err(EvolveError::InvalidConfig("tourney_size must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.p_mut) {
            return Err(EvolveError::InvalidConfig("p_mut must be within [0, 1]"));
        }
        if !(self.mut_weight.is_finite() && self.mut_weight >= 0.0) {
            return Err(EvolveError::InvalidConfig("mut_weight must be non-negative"));
        }
        Ok(())
    }

    #[must_use]
    pub fn mutation_rates(&self) -> MutationRates {
        MutationRates {
            probability: self.p_mut,
            weight: self.mut_weight,
            radius: self.mut_radius,
            alpha: self.mut_alpha,
        }
    }

    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Polling and deadline settings for the generation barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Interval between readiness polls.
    pub wait: Duration,
    /// Longest a generation may stay outstanding before the run aborts.
    pub timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(1),
            timeout: Duration::from_secs(3_600),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.wait.is_zero() {
            return Err(EvolveError::InvalidConfig("wait interval must be non-zero"));
        }
        if self.timeout < self.wait {
            return Err(EvolveError::InvalidConfig(
                "timeout must not be shorter than the wait interval",
            ));
        }
        Ok(())
    }
}
