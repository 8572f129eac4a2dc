pub mod run;
pub mod unseal;

use std::path::Path;
use std::sync::Arc;

use chunkwatch_core::{FixedSensor, MetricSource, PipelineConfig, SystemSensor};

/// Load a config file, or the defaults when no path is given.
/// Exits with a message on a bad file.
pub fn load_config(path: Option<&str>) -> PipelineConfig {
    match path {
        Some(p) => PipelineConfig::load(Path::new(p)).unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }),
        None => PipelineConfig::default(),
    }
}

/// Host sensor, or a fixed reading when `--fixed-cpu` is given.
pub fn make_source(
    config: &PipelineConfig,
    fixed_cpu: Option<f64>,
    fixed_mem: Option<f64>,
) -> Arc<dyn MetricSource> {
    match fixed_cpu {
        Some(cpu) => Arc::new(FixedSensor::new(cpu, fixed_mem.unwrap_or(0.0))),
        None => Arc::new(SystemSensor::new(config.sensor_window())),
    }
}
