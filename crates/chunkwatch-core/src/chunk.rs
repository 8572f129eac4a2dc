//! Input chunks, the chunk transformation, and chunk generators.
//!
//! A [`Chunk`] is a batch of records with an optional `value` column.
//! A [`ChunkProcessor`] cleans it into a [`ProcessedChunk`], where every row
//! has a finite `value` and the derived `processed` field.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{PipelineError, Result};

/// One batch of raw records. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    index: usize,
    values: Vec<Option<f64>>,
}

impl Chunk {
    pub fn new(index: usize, values: Vec<Option<f64>>) -> Self {
        Self { index, values }
    }

    /// Position of this chunk in the input stream (0-based).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A cleaned record: `value` is always present and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedRow {
    pub value: f64,
    pub processed: f64,
}

/// Result of running a [`ChunkProcessor`] over one [`Chunk`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedChunk {
    index: usize,
    rows: Vec<ProcessedRow>,
    dropped: usize,
}

impl ProcessedChunk {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rows(&self) -> &[ProcessedRow] {
        &self.rows
    }

    /// Number of input rows removed during cleaning.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub(crate) fn into_rows(self) -> Vec<ProcessedRow> {
        self.rows
    }
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

/// Pure chunk transformation.
pub trait ChunkProcessor: Send + Sync {
    /// Clean one chunk. Fails with [`PipelineError::InvalidChunk`] when no
    /// valid rows remain.
    fn process(&self, chunk: &Chunk) -> Result<ProcessedChunk>;
}

/// Drops rows with a missing or non-finite value and derives `value²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareProcessor;

impl ChunkProcessor for SquareProcessor {
    fn process(&self, chunk: &Chunk) -> Result<ProcessedChunk> {
        let rows: Vec<ProcessedRow> = chunk
            .values()
            .iter()
            .filter_map(|v| v.filter(|x| x.is_finite()))
            .map(|value| ProcessedRow {
                value,
                processed: value * value,
            })
            .collect();

        if rows.is_empty() {
            return Err(PipelineError::InvalidChunk {
                index: chunk.index(),
            });
        }

        Ok(ProcessedChunk {
            index: chunk.index(),
            dropped: chunk.len() - rows.len(),
            rows,
        })
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Source of input chunks.
pub trait ChunkGenerator: Send {
    fn next_chunk(&mut self, index: usize, size: usize) -> Chunk;
}

/// Standard-normal values with an optional rate of missing rows.
pub struct RandomChunks {
    rng: StdRng,
    missing_rate: f64,
}

impl RandomChunks {
    pub fn new(seed: Option<u64>, missing_rate: f64) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            missing_rate: missing_rate.clamp(0.0, 1.0),
        }
    }
}

impl ChunkGenerator for RandomChunks {
    fn next_chunk(&mut self, index: usize, size: usize) -> Chunk {
        let values = (0..size)
            .map(|_| {
                if self.missing_rate > 0.0 && self.rng.random_bool(self.missing_rate) {
                    None
                } else {
                    Some(self.rng.sample::<f64, _>(StandardNormal))
                }
            })
            .collect();
        Chunk::new(index, values)
    }
}
