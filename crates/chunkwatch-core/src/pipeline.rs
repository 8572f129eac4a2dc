//! Orchestrator: wires worker, sampler and renderer together and seals the result.
//!
//! Lifecycle:
//! 1. open the render surface (publishes the [`SurfaceFlag`] as open)
//! 2. spawn the processing worker
//! 3. start the continuous sampler, gated on the flag
//! 4. run the render loop on the calling thread until the surface closes
//! 5. wait for the worker, then seal its finalized result set
//!
//! A surface that fails to open is treated as already closed: no sampler, no
//! render loop, but the result is still processed and sealed. A worker
//! failure closes the flag, which ends the render loop early and aborts the
//! run without sealing. The sampler is detached; it notices the closed flag
//! within one interval. A sampler that fails to start is logged and skipped.

use std::sync::Arc;
use std::sync::mpsc;

use log::{info, warn};

use crate::chunk::{ChunkGenerator, ChunkProcessor, RandomChunks, SquareProcessor};
use crate::config::{PipelineConfig, SamplerStart};
use crate::error::Result;
use crate::render::{RenderReport, RenderSurface, SurfaceFlag, WindowRenderer};
use crate::result::ResultCell;
use crate::sampler::ContinuousSampler;
use crate::seal::{ResultSealer, SealedResult};
use crate::sensor::{MetricSource, SystemSensor};
use crate::series::{Sample, SharedSeries};
use crate::worker::{ProcessingWorker, WorkerReport};

/// Everything the operator needs once a run completes.
#[derive(Debug)]
pub struct RunOutcome {
    pub sealed: SealedResult,
    pub worker: WorkerReport,
    pub render: RenderReport,
    /// Series contents at the moment sealing started.
    pub samples: Vec<Sample>,
}

pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn MetricSource>,
    processor: Arc<dyn ChunkProcessor>,
    generator: Box<dyn ChunkGenerator>,
}

impl Pipeline {
    /// Pipeline with the default collaborators: system sensor, squaring
    /// processor, random normal chunks.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source: Arc::new(SystemSensor::new(config.sensor_window())),
            processor: Arc::new(SquareProcessor),
            generator: Box::new(RandomChunks::new(config.seed, config.missing_rate)),
            config,
        })
    }

    pub fn with_source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn ChunkProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_generator(mut self, generator: Box<dyn ChunkGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn sampler(&self, series: &Arc<SharedSeries>) -> ContinuousSampler {
        ContinuousSampler::new(
            Arc::clone(&self.source),
            Arc::clone(series),
            self.config.sample_interval(),
        )
    }

    /// Run to completion, rendering on `surface` from the calling thread.
    pub fn run<S: RenderSurface + ?Sized>(self, surface: &mut S) -> Result<RunOutcome> {
        let series = Arc::new(SharedSeries::new());
        let results = Arc::new(ResultCell::new());
        let (tx, rx) = mpsc::channel();

        let mut renderer = WindowRenderer::new(
            Arc::clone(&series),
            self.config.render_tick(),
            self.config.visible_window(),
        )
        .with_progress(rx);
        // A surface that cannot open counts as one the user closed at once:
        // processing and sealing still happen, only the display is skipped.
        let displayed = match renderer.open(surface, &self.config.title) {
            Ok(()) => true,
            Err(e) => {
                warn!("render surface failed to open, continuing without display: {e}");
                surface.close();
                false
            }
        };
        let flag = renderer.flag();

        let sampler = self.sampler(&series);
        let mut worker = ProcessingWorker::new(
            &self.config,
            self.generator,
            self.processor,
            Arc::clone(&self.source),
            Arc::clone(&series),
            Arc::clone(&results),
        )
        .with_progress(tx);

        let mut sampler_now = None;
        if displayed {
            match self.config.sampler_start {
                SamplerStart::OnSurfaceOpen => sampler_now = Some(sampler),
                SamplerStart::AfterProcessing => {
                    let gate = flag.clone();
                    worker = worker.on_finish(move || start_detached(sampler, gate));
                }
            }
        }

        let abort = flag.clone();
        let spawned = worker
            .on_failure(move |e| {
                warn!("processing failed, closing display: {e}");
                abort.close();
            })
            .spawn();
        let worker = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                shut_down(&flag, surface);
                return Err(e);
            }
        };

        if let Some(sampler) = sampler_now {
            start_detached(sampler, flag.clone());
        }

        let render = if displayed {
            renderer.render_loop(surface)
        } else {
            RenderReport::default()
        };

        if !worker.is_finished() {
            info!("display closed; waiting for processing to finish");
        }
        let report = worker.join()?;

        let samples = series.snapshot();
        let sealed = ResultSealer::new().seal(&results)?;
        info!(
            "sealed {} rows from {} chunks ({} bytes ciphertext)",
            sealed.rows(),
            sealed.chunks(),
            sealed.ciphertext().len()
        );

        Ok(RunOutcome {
            sealed,
            worker: report,
            render,
            samples,
        })
    }
}

/// Close the display and stop anything gated on it.
fn shut_down<S: RenderSurface + ?Sized>(flag: &SurfaceFlag, surface: &mut S) {
    flag.close();
    surface.close();
}

fn start_detached(sampler: ContinuousSampler, gate: SurfaceFlag) {
    if !gate.is_open() {
        return;
    }
    match sampler.start(move || gate.is_open()) {
        Ok(handle) => handle.detach(),
        Err(e) => warn!("could not start sampler: {e}"),
    }
}
