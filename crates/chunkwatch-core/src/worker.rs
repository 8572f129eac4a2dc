//! Processing worker: chunks in, one CPU sample per chunk, a finalized result set out.
//!
//! Per chunk: generate → process → accumulate → simulated work delay →
//! one sensor reading appended to the shared series → progress event.
//! After the last chunk the accumulated chunks are concatenated and published
//! to the [`ResultCell`]. A chunk error stops the worker without publishing.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use crate::chunk::{ChunkGenerator, ChunkProcessor, ProcessedChunk};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::result::{ResultCell, ResultSet};
use crate::sensor::{MetricSource, ResourceReading};
use crate::series::SharedSeries;

/// Emitted once per processed chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// 1-based number of the chunk just processed.
    pub chunk: usize,
    pub total: usize,
    pub rows: usize,
    /// `None` when the sensor read failed and the sample was skipped.
    pub reading: Option<ResourceReading>,
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reading {
            Some(r) => write!(
                f,
                "Chunk {}/{} processed. CPU: {:.1}%, Memory: {:.1}%",
                self.chunk, self.total, r.cpu_percent, r.memory_percent
            ),
            None => write!(
                f,
                "Chunk {}/{} processed. CPU: n/a, Memory: n/a",
                self.chunk, self.total
            ),
        }
    }
}

/// Totals for a completed worker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerReport {
    pub chunks: usize,
    pub rows: usize,
    pub dropped_rows: usize,
    pub samples: usize,
    pub skipped_samples: usize,
}

type FinishHook = Box<dyn FnOnce() + Send>;
type FailureHook = Box<dyn FnOnce(&PipelineError) + Send>;

pub struct ProcessingWorker {
    chunk_count: usize,
    chunk_size: usize,
    work_delay: Duration,
    generator: Box<dyn ChunkGenerator>,
    processor: Arc<dyn ChunkProcessor>,
    source: Arc<dyn MetricSource>,
    series: Arc<SharedSeries>,
    results: Arc<ResultCell>,
    progress: Option<Sender<ProgressEvent>>,
    on_finish: Option<FinishHook>,
    on_failure: Option<FailureHook>,
}

impl ProcessingWorker {
    pub fn new(
        config: &PipelineConfig,
        generator: Box<dyn ChunkGenerator>,
        processor: Arc<dyn ChunkProcessor>,
        source: Arc<dyn MetricSource>,
        series: Arc<SharedSeries>,
        results: Arc<ResultCell>,
    ) -> Self {
        Self {
            chunk_count: config.chunk_count,
            chunk_size: config.chunk_size,
            work_delay: config.work_delay(),
            generator,
            processor,
            source,
            series,
            results,
            progress: None,
            on_finish: None,
            on_failure: None,
        }
    }

    /// Send a [`ProgressEvent`] per chunk to `tx`. A dropped receiver is ignored.
    pub fn with_progress(mut self, tx: Sender<ProgressEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Run `hook` once the result set has been published.
    pub fn on_finish(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(hook));
        self
    }

    /// Run `hook` when the worker fails or panics.
    pub fn on_failure(mut self, hook: impl FnOnce(&PipelineError) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(hook));
        self
    }

    /// Process every chunk on the calling thread.
    pub fn run(mut self) -> Result<WorkerReport> {
        let on_finish = self.on_finish.take();
        let on_failure = self.on_failure.take();

        match self.process_all() {
            Ok(report) => {
                if let Some(hook) = on_finish {
                    hook();
                }
                Ok(report)
            }
            Err(e) => {
                if let Some(hook) = on_failure {
                    hook(&e);
                }
                Err(e)
            }
        }
    }

    fn process_all(&mut self) -> Result<WorkerReport> {
        info!(
            "starting processing: {} chunks of {} rows",
            self.chunk_count, self.chunk_size
        );
        let mut report = WorkerReport::default();
        let mut processed: Vec<ProcessedChunk> = Vec::with_capacity(self.chunk_count);

        for index in 0..self.chunk_count {
            let chunk = self.generator.next_chunk(index, self.chunk_size);
            let cleaned = self.processor.process(&chunk)?;
            let rows = cleaned.rows().len();
            report.rows += rows;
            report.dropped_rows += cleaned.dropped();
            processed.push(cleaned);

            if !self.work_delay.is_zero() {
                thread::sleep(self.work_delay);
            }

            let reading = match self.source.sample() {
                Ok(r) => {
                    self.series.record(r.cpu_percent);
                    report.samples += 1;
                    Some(r)
                }
                Err(e) => {
                    warn!("chunk {}: skipping sample: {e}", index + 1);
                    report.skipped_samples += 1;
                    None
                }
            };

            let event = ProgressEvent {
                chunk: index + 1,
                total: self.chunk_count,
                rows,
                reading,
            };
            info!("{event}");
            if let Some(tx) = &self.progress {
                let _ = tx.send(event);
            }
            report.chunks += 1;
        }

        self.results.publish(ResultSet::concat(processed));
        info!(
            "processing complete: {} rows ({} dropped)",
            report.rows, report.dropped_rows
        );
        Ok(report)
    }

    /// Run on a dedicated thread. Panics are caught and reported as
    /// [`PipelineError::WorkerPanicked`].
    pub fn spawn(mut self) -> Result<WorkerHandle> {
        let on_failure = self.on_failure.take();
        let handle = thread::Builder::new()
            .name("chunkwatch-worker".into())
            .spawn(move || {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.run()));
                match outcome {
                    Ok(Ok(report)) => Ok(report),
                    Ok(Err(e)) => {
                        if let Some(hook) = on_failure {
                            hook(&e);
                        }
                        Err(e)
                    }
                    Err(_) => {
                        let e = PipelineError::WorkerPanicked;
                        if let Some(hook) = on_failure {
                            hook(&e);
                        }
                        Err(e)
                    }
                }
            })?;
        Ok(WorkerHandle { handle })
    }
}

/// Handle to a worker running on its own thread.
pub struct WorkerHandle {
    handle: JoinHandle<Result<WorkerReport>>,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its outcome.
    pub fn join(self) -> Result<WorkerReport> {
        self.handle
            .join()
            .unwrap_or(Err(PipelineError::WorkerPanicked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, RandomChunks, SquareProcessor};
    use crate::sensor::FixedSensor;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    fn config(chunks: usize, size: usize) -> PipelineConfig {
        PipelineConfig {
            chunk_count: chunks,
            chunk_size: size,
            work_delay_ms: 0,
            seed: Some(11),
            ..Default::default()
        }
    }

    fn worker(
        cfg: &PipelineConfig,
        generator: Box<dyn ChunkGenerator>,
        source: Arc<dyn MetricSource>,
    ) -> (ProcessingWorker, Arc<SharedSeries>, Arc<ResultCell>) {
        let series = Arc::new(SharedSeries::new());
        let results = Arc::new(ResultCell::new());
        let w = ProcessingWorker::new(
            cfg,
            generator,
            Arc::new(SquareProcessor),
            source,
            Arc::clone(&series),
            Arc::clone(&results),
        );
        (w, series, results)
    }

    /// Emits all-missing chunks from `bad_from` onwards.
    struct BreaksAt {
        bad_from: usize,
    }

    impl ChunkGenerator for BreaksAt {
        fn next_chunk(&mut self, index: usize, size: usize) -> Chunk {
            if index >= self.bad_from {
                Chunk::new(index, vec![None; size])
            } else {
                Chunk::new(index, vec![Some(1.0); size])
            }
        }
    }

    /// Fails every other reading.
    struct FlakySensor {
        calls: AtomicUsize,
    }

    impl MetricSource for FlakySensor {
        fn sample(&self) -> Result<ResourceReading> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                Err(PipelineError::Sensor("busy".into()))
            } else {
                Ok(ResourceReading {
                    cpu_percent: 5.0,
                    memory_percent: 6.0,
                })
            }
        }
    }

    #[test]
    fn ten_chunks_yield_ten_samples_and_ten_chunks() {
        let cfg = config(10, 1000);
        let (w, series, results) = worker(
            &cfg,
            Box::new(RandomChunks::new(cfg.seed, 0.0)),
            Arc::new(FixedSensor::new(42.0, 10.0)),
        );
        let report = w.run().unwrap();

        assert_eq!(report.chunks, 10);
        assert_eq!(report.samples, 10);
        assert_eq!(series.len(), 10);
        let set = results.take().unwrap();
        assert_eq!(set.chunk_count(), 10);
        assert_eq!(set.row_count(), 10_000);
    }

    #[test]
    fn progress_is_reported_per_chunk() {
        let cfg = config(3, 10);
        let (tx, rx) = mpsc::channel();
        let (w, _, _) = worker(
            &cfg,
            Box::new(RandomChunks::new(cfg.seed, 0.0)),
            Arc::new(FixedSensor::new(42.0, 10.0)),
        );
        w.with_progress(tx).run().unwrap();

        let events: Vec<ProgressEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].chunk, 3);
        assert_eq!(events[2].total, 3);
        assert_eq!(events[0].reading.map(|r| r.cpu_percent), Some(42.0));
        assert_eq!(
            events[0].to_string(),
            "Chunk 1/3 processed. CPU: 42.0%, Memory: 10.0%"
        );
    }

    #[test]
    fn chunk_error_stops_without_publishing() {
        let cfg = config(5, 10);
        let failed = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&failed);
        let (w, series, results) = worker(
            &cfg,
            Box::new(BreaksAt { bad_from: 2 }),
            Arc::new(FixedSensor::new(1.0, 1.0)),
        );
        let err = w
            .on_failure(move |e| *seen.lock().unwrap() = Some(e.to_string()))
            .run()
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidChunk { index: 2 }));
        assert_eq!(series.len(), 2);
        assert!(!results.is_ready());
        assert_eq!(
            failed.lock().unwrap().as_deref(),
            Some("chunk 2 has no valid rows")
        );
    }

    #[test]
    fn sensor_errors_skip_samples_only() {
        let cfg = config(4, 10);
        let (w, series, results) = worker(
            &cfg,
            Box::new(RandomChunks::new(cfg.seed, 0.0)),
            Arc::new(FlakySensor {
                calls: AtomicUsize::new(0),
            }),
        );
        let report = w.run().unwrap();
        assert_eq!(report.chunks, 4);
        assert_eq!(report.samples, 2);
        assert_eq!(report.skipped_samples, 2);
        assert_eq!(series.len(), 2);
        assert!(results.is_ready());
    }

    #[test]
    fn spawned_worker_runs_finish_hook() {
        let cfg = config(2, 10);
        let finished = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&finished);
        let (w, _, results) = worker(
            &cfg,
            Box::new(RandomChunks::new(cfg.seed, 0.0)),
            Arc::new(FixedSensor::new(1.0, 1.0)),
        );
        let handle = w
            .on_finish(move || {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .spawn()
            .unwrap();
        let report = handle.join().unwrap();
        assert_eq!(report.chunks, 2);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(results.is_ready());
    }

    #[test]
    fn spawned_worker_surfaces_chunk_error() {
        let cfg = config(3, 10);
        let (w, _, _) = worker(
            &cfg,
            Box::new(BreaksAt { bad_from: 0 }),
            Arc::new(FixedSensor::new(1.0, 1.0)),
        );
        let err = w.spawn().unwrap().join().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidChunk { index: 0 }));
    }
}
