//! Population records addressed by generation and index.
//!
//! The filesystem store lays records out flat in one directory:
//! `<gen>_<idx>.json` for genomes, `<gen>_<idx>.fit` for fitness results, and
//! `<gen>.stats` for per-generation summaries. Generation and index share one
//! zero-padded width so that lexicographic order matches numeric order.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use swarm_core::ParameterGenome;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{EvolveError, Generation};

/// Score produced by one simulation plus any auxiliary result fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    pub fitness: i64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Fitness document written next to each genome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitnessRecord {
    /// Genome record the result was computed from.
    #[serde(default)]
    pub genome: PathBuf,
    pub result: SimulationResult,
}

impl FitnessRecord {
    #[must_use]
    pub fn new(genome: impl Into<PathBuf>, fitness: i64) -> Self {
        Self {
            genome: genome.into(),
            result: SimulationResult {
                fitness,
                details: Map::new(),
            },
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.result.details.insert(key.into(), value);
        self
    }

    #[must_use]
    pub const fn fitness(&self) -> i64 {
        self.result.fitness
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FitnessDocument {
    Bare(i64),
    Record(FitnessRecord),
}

impl FitnessDocument {
    const fn fitness(&self) -> i64 {
        match self {
            Self::Bare(fitness) => *fitness,
            Self::Record(record) => record.fitness(),
        }
    }
}

/// Best and median fitness of one generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationStats {
    pub best: i64,
    pub median: i64,
}

/// Key/value storage for genomes, fitness results, and generation summaries.
pub trait PopulationStore {
    /// Location handed to a simulation runner for one genome record.
    fn genome_path(&self, generation: Generation, index: usize) -> PathBuf;
    fn has_genome(&self, generation: Generation, index: usize) -> bool;
    fn write_genome(
        &self,
        generation: Generation,
        index: usize,
        genome: &ParameterGenome,
    ) -> Result<(), EvolveError>;
    fn read_genome(
        &self,
        generation: Generation,
        index: usize,
    ) -> Result<ParameterGenome, EvolveError>;
    fn write_fitness(
        &self,
        generation: Generation,
        index: usize,
        record: &FitnessRecord,
    ) -> Result<(), EvolveError>;
    /// Recorded fitness, `None` when the individual has not been scored yet.
    fn read_fitness(
        &self,
        generation: Generation,
        index: usize,
    ) -> Result<Option<i64>, EvolveError>;
    fn write_stats(
        &self,
        generation: Generation,
        stats: &GenerationStats,
    ) -> Result<(), EvolveError>;
    fn read_stats(&self, generation: Generation) -> Result<Option<GenerationStats>, EvolveError>;
}

/// Digits needed to print `popsize - 1`.
#[must_use]
pub fn index_width(popsize: usize) -> usize {
    popsize.saturating_sub(1).to_string().len()
}

/// Directory-backed [`PopulationStore`] with atomic record publication.
#[derive(Debug, Clone)]
pub struct FsPopulationStore {
    root: PathBuf,
    width: usize,
}

impl FsPopulationStore {
    /// Open (creating if needed) a store rooted at `root` for `popsize` individuals.
    pub fn open(root: impl Into<PathBuf>, popsize: usize) -> Result<Self, EvolveError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| EvolveError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            width: index_width(popsize),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, generation: Generation, index: usize, extension: &str) -> PathBuf {
        let width = self.width;
        self.root
            .join(format!("{generation:0width$}_{index:0width$}.{extension}"))
    }

    #[must_use]
    pub fn fitness_path(&self, generation: Generation, index: usize) -> PathBuf {
        self.record_path(generation, index, "fit")
    }

    #[must_use]
    pub fn stats_path(&self, generation: Generation) -> PathBuf {
        let width = self.width;
        self.root.join(format!("{generation:0width$}.stats"))
    }

    /// Serialize into a temporary sibling, then rename over `path`.
    fn publish<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), EvolveError> {
        let io_error = |source: io::Error| EvolveError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| EvolveError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let mut staging = NamedTempFile::new_in(&self.root).map_err(io_error)?;
        staging.write_all(&bytes).map_err(io_error)?;
        staging.as_file().sync_all().map_err(io_error)?;
        staging
            .persist(path)
            .map_err(|err| io_error(err.error))?;
        debug!(path = %path.display(), "record published");
        Ok(())
    }
}

impl PopulationStore for FsPopulationStore {
    fn genome_path(&self, generation: Generation, index: usize) -> PathBuf {
        self.record_path(generation, index, "json")
    }

    fn has_genome(&self, generation: Generation, index: usize) -> bool {
        self.genome_path(generation, index).is_file()
    }

    fn write_genome(
        &self,
        generation: Generation,
        index: usize,
        genome: &ParameterGenome,
    ) -> Result<(), EvolveError> {
        self.publish(&self.genome_path(generation, index), genome)
    }

    fn read_genome(
        &self,
        generation: Generation,
        index: usize,
    ) -> Result<ParameterGenome, EvolveError> {
        read_genome_file(&self.genome_path(generation, index))
    }

    fn write_fitness(
        &self,
        generation: Generation,
        index: usize,
        record: &FitnessRecord,
    ) -> Result<(), EvolveError> {
        self.publish(&self.fitness_path(generation, index), record)
    }

    fn read_fitness(
        &self,
        generation: Generation,
        index: usize,
    ) -> Result<Option<i64>, EvolveError> {
        let document: Option<FitnessDocument> = load(&self.fitness_path(generation, index))?;
        Ok(document.map(|doc| doc.fitness()))
    }

    fn write_stats(
        &self,
        generation: Generation,
        stats: &GenerationStats,
    ) -> Result<(), EvolveError> {
        self.publish(&self.stats_path(generation), stats)
    }

    fn read_stats(&self, generation: Generation) -> Result<Option<GenerationStats>, EvolveError> {
        load(&self.stats_path(generation))
    }
}

/// Load and validate a genome record from an arbitrary path.
pub fn read_genome_file(path: &Path) -> Result<ParameterGenome, EvolveError> {
    let genome: ParameterGenome = load(path)?.ok_or_else(|| EvolveError::Io {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::NotFound, "genome record not found"),
    })?;
    genome.validate()?;
    Ok(genome)
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, EvolveError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| EvolveError::Json {
                path: path.to_path_buf(),
                source,
            }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(EvolveError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
