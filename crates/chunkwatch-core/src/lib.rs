//! # chunkwatch-core
//!
//! Process a stream of data chunks while watching host CPU usage live, then
//! seal the processed result with a one-time key.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chunkwatch_core::{Pipeline, PipelineConfig, TimedSurface};
//! use std::time::Duration;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
//! let mut surface = TimedSurface::new(Some(Duration::from_secs(10)));
//! let outcome = pipeline.run(&mut surface).unwrap();
//!
//! println!("key: {}", outcome.sealed.key().expose());
//! println!("{} bytes sealed", outcome.sealed.ciphertext().len());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ProcessingWorker ──┐                        ┌──> ResultCell ──> ResultSealer
//!   (chunks, 1 sample per chunk)              │
//!                    ├──> SharedSeries ──> WindowRenderer ──> RenderSurface
//! ContinuousSampler ─┘    (append-only)       (trailing window, main thread)
//!   (gated on SurfaceFlag)
//! ```
//!
//! The [`SharedSeries`] is the only shared mutable state. Producers append,
//! the renderer copies snapshots. Closing the surface is the single stop
//! signal for the sampler; the orchestrator ([`Pipeline`]) seals only after
//! the worker has published its finalized [`ResultSet`].

pub mod chunk;
pub mod config;
pub mod error;
pub mod headless;
pub mod pipeline;
pub mod render;
pub mod result;
pub mod sampler;
pub mod seal;
pub mod sensor;
pub mod series;
pub mod worker;

pub use chunk::{
    Chunk, ChunkGenerator, ChunkProcessor, ProcessedChunk, ProcessedRow, RandomChunks,
    SquareProcessor,
};
pub use config::{PipelineConfig, SamplerStart};
pub use error::{PipelineError, Result};
pub use headless::TimedSurface;
pub use pipeline::{Pipeline, RunOutcome};
pub use render::{
    CPU_RANGE, RenderReport, RenderSurface, SurfaceFlag, WindowFrame, WindowRenderer,
    compute_frame, visible_range,
};
pub use result::{ResultCell, ResultSet};
pub use sampler::{ContinuousSampler, SamplerHandle};
pub use seal::{ResultSealer, SealKey, SealedResult, unseal};
pub use sensor::{FixedSensor, MetricSource, ResourceReading, SystemSensor};
pub use series::{Sample, SharedSeries};
pub use worker::{ProcessingWorker, ProgressEvent, WorkerHandle, WorkerReport};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
