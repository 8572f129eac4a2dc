//! Run configuration.
//!
//! Every field has a default, so a JSON config file may override any subset:
//!
//! ```json
//! { "chunk_count": 20, "visible_window_secs": 30.0 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// When the continuous sampler is started relative to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerStart {
    /// As soon as the render surface reports open.
    #[default]
    OnSurfaceOpen,
    /// Only once the processing worker has finished.
    AfterProcessing,
}

impl std::fmt::Display for SamplerStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnSurfaceOpen => write!(f, "on_surface_open"),
            Self::AfterProcessing => write!(f, "after_processing"),
        }
    }
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunk_count: usize,
    pub chunk_size: usize,
    /// Simulated work per chunk.
    pub work_delay_ms: u64,
    /// Continuous sampler cadence.
    pub sample_interval_ms: u64,
    /// How long the system sensor measures CPU for one reading.
    pub sensor_window_ms: u64,
    pub render_tick_ms: u64,
    /// Width of the trailing window shown by the renderer.
    pub visible_window_secs: f64,
    /// Fraction of generated rows with a missing value, in [0, 1].
    pub missing_rate: f64,
    pub seed: Option<u64>,
    pub sampler_start: SamplerStart,
    pub title: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_count: 10,
            chunk_size: 1000,
            work_delay_ms: 500,
            sample_interval_ms: 100,
            sensor_window_ms: 100,
            render_tick_ms: 500,
            visible_window_secs: 10.0,
            missing_rate: 0.0,
            seed: None,
            sampler_start: SamplerStart::default(),
            title: "CPU usage (live)".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_count == 0 {
            return Err(PipelineError::Config("chunk_count must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(PipelineError::Config("chunk_size must be at least 1".into()));
        }
        if self.sample_interval_ms == 0 || self.render_tick_ms == 0 {
            return Err(PipelineError::Config(
                "sample and render intervals must be non-zero".into(),
            ));
        }
        if !(self.visible_window_secs.is_finite() && self.visible_window_secs > 0.0) {
            return Err(PipelineError::Config(format!(
                "visible_window_secs must be positive, got {}",
                self.visible_window_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.missing_rate) {
            return Err(PipelineError::Config(format!(
                "missing_rate must be within [0, 1], got {}",
                self.missing_rate
            )));
        }
        Ok(())
    }

    pub fn work_delay(&self) -> Duration {
        Duration::from_millis(self.work_delay_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn sensor_window(&self) -> Duration {
        Duration::from_millis(self.sensor_window_ms)
    }

    pub fn render_tick(&self) -> Duration {
        Duration::from_millis(self.render_tick_ms)
    }

    pub fn visible_window(&self) -> Duration {
        Duration::from_secs_f64(self.visible_window_secs)
    }
}
