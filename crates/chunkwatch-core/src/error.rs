//! Pipeline error taxonomy.
//!
//! Propagation rules:
//! - [`PipelineError::Sensor`] is recoverable: producers log it and skip the sample.
//! - [`PipelineError::InvalidChunk`] / [`PipelineError::Chunk`] stop the worker and
//!   abort the run without sealing.
//! - [`PipelineError::ResultNotReady`] means the sealer was called out of order.
//! - [`PipelineError::RenderSurface`] is treated as the display closing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("sensor unavailable: {0}")]
    Sensor(String),

    #[error("chunk {index} has no valid rows")]
    InvalidChunk { index: usize },

    #[error("chunk {index} failed: {reason}")]
    Chunk { index: usize, reason: String },

    #[error("result set is not finalized yet")]
    ResultNotReady,

    #[error("render surface error: {0}")]
    RenderSurface(String),

    #[error("sealing failed: {0}")]
    Seal(String),

    #[error("processing worker panicked")]
    WorkerPanicked,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors that end the run (everything except skipped sensor reads).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Sensor(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_errors_are_not_fatal() {
        assert!(!PipelineError::Sensor("busy".into()).is_fatal());
        assert!(PipelineError::InvalidChunk { index: 3 }.is_fatal());
        assert!(PipelineError::ResultNotReady.is_fatal());
    }

    #[test]
    fn messages_name_the_chunk() {
        let e = PipelineError::InvalidChunk { index: 7 };
        assert_eq!(e.to_string(), "chunk 7 has no valid rows");
    }
}
