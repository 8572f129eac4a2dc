//! The accumulated result set and its write-once hand-off.

use std::io::Write;
use std::sync::Mutex;

use crate::chunk::{ProcessedChunk, ProcessedRow};
use crate::error::{PipelineError, Result};

/// Ordered concatenation of every processed chunk. Frozen once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    rows: Vec<ProcessedRow>,
    chunk_count: usize,
}

impl ResultSet {
    /// Concatenate chunks in the given order.
    pub fn concat(chunks: Vec<ProcessedChunk>) -> Self {
        let chunk_count = chunks.len();
        let rows = chunks.into_iter().flat_map(ProcessedChunk::into_rows).collect();
        Self { rows, chunk_count }
    }

    pub fn rows(&self) -> &[ProcessedRow] {
        &self.rows
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Write the set as CSV: a `value,processed` header, then one line per row.
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "value,processed")?;
        for row in &self.rows {
            writeln!(out, "{},{}", row.value, row.processed)?;
        }
        out.flush()
    }

    pub fn to_csv(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.rows.len() * 40 + 16);
        // Writing into a Vec cannot fail.
        let _ = self.write_csv(&mut buf);
        buf
    }
}

enum CellState {
    Pending,
    Ready(ResultSet),
    Consumed,
}

/// Write-once slot the worker publishes the finalized [`ResultSet`] into.
///
/// The sealer takes the set out exactly once; taking before publication is
/// an ordering error ([`PipelineError::ResultNotReady`]).
pub struct ResultCell {
    state: Mutex<CellState>,
}

impl Default for ResultCell {
    fn default() -> Self {
        Self {
            state: Mutex::new(CellState::Pending),
        }
    }
}

impl ResultCell {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CellState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Publish the finalized set. Only the first publication is kept.
    pub fn publish(&self, set: ResultSet) -> bool {
        let mut state = self.lock();
        if matches!(*state, CellState::Pending) {
            *state = CellState::Ready(set);
            true
        } else {
            false
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), CellState::Ready(_))
    }

    /// Take the finalized set out of the cell.
    pub fn take(&self) -> Result<ResultSet> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, CellState::Consumed) {
            CellState::Ready(set) => Ok(set),
            CellState::Pending => {
                *state = CellState::Pending;
                Err(PipelineError::ResultNotReady)
            }
            CellState::Consumed => Err(PipelineError::Seal("result set already sealed".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, ChunkProcessor, SquareProcessor};

    fn processed(index: usize, values: &[f64]) -> ProcessedChunk {
        let chunk = Chunk::new(index, values.iter().copied().map(Some).collect());
        SquareProcessor.process(&chunk).unwrap()
    }

    #[test]
    fn concat_keeps_chunk_order() {
        let set = ResultSet::concat(vec![processed(0, &[1.0, 2.0]), processed(1, &[3.0])]);
        assert_eq!(set.chunk_count(), 2);
        let values: Vec<f64> = set.rows().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let set = ResultSet::concat(vec![processed(0, &[1.5, -2.0])]);
        let csv = String::from_utf8(set.to_csv()).unwrap();
        assert_eq!(csv, "value,processed\n1.5,2.25\n-2,4\n");
    }

    #[test]
    fn take_before_publish_is_not_ready() {
        let cell = ResultCell::new();
        assert!(matches!(cell.take(), Err(PipelineError::ResultNotReady)));
        // Still pending afterwards: a later publish works.
        assert!(cell.publish(ResultSet::concat(vec![processed(0, &[1.0])])));
        assert!(cell.is_ready());
    }

    #[test]
    fn take_consumes_exactly_once() {
        let cell = ResultCell::new();
        cell.publish(ResultSet::concat(vec![processed(0, &[1.0])]));
        assert!(cell.take().is_ok());
        assert!(matches!(cell.take(), Err(PipelineError::Seal(_))));
        assert!(!cell.publish(ResultSet::concat(vec![])));
    }
}
