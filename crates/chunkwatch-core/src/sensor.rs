//! Host resource readings.
//!
//! Every sensor implements the [`MetricSource`] trait. Readings are
//! synchronous and may block for a short, bounded measurement window.

use std::sync::Mutex;
use std::time::Duration;

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use crate::error::{PipelineError, Result};

/// One utilization snapshot. Both values are percentages in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceReading {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Trait every utilization sensor must implement.
///
/// Shared between the processing worker and the continuous sampler, so
/// implementations must be callable from several threads.
pub trait MetricSource: Send + Sync {
    /// Take one reading. Errors are recoverable: callers skip the sample.
    fn sample(&self) -> Result<ResourceReading>;
}

// ---------------------------------------------------------------------------
// SystemSensor
// ---------------------------------------------------------------------------

/// Reads global CPU and memory utilization through `sysinfo`.
///
/// CPU usage is a delta between two refreshes, so each reading blocks for
/// the measurement window (never less than sysinfo's minimum update interval).
pub struct SystemSensor {
    system: Mutex<System>,
    window: Duration,
}

impl SystemSensor {
    pub fn new(window: Duration) -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        Self {
            system: Mutex::new(system),
            window: window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }
}

impl Default for SystemSensor {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl MetricSource for SystemSensor {
    fn sample(&self) -> Result<ResourceReading> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| PipelineError::Sensor("sensor state poisoned".into()))?;

        system.refresh_cpu_usage();
        std::thread::sleep(self.window);
        system.refresh_cpu_usage();
        system.refresh_memory();

        if system.cpus().is_empty() {
            return Err(PipelineError::Sensor("no CPUs reported".into()));
        }
        let total = system.total_memory();
        if total == 0 {
            return Err(PipelineError::Sensor("total memory reported as zero".into()));
        }

        let cpu = f64::from(system.global_cpu_usage());
        let memory = system.used_memory() as f64 / total as f64 * 100.0;
        Ok(ResourceReading {
            cpu_percent: cpu.clamp(0.0, 100.0),
            memory_percent: memory.clamp(0.0, 100.0),
        })
    }
}

// ---------------------------------------------------------------------------
// FixedSensor
// ---------------------------------------------------------------------------

/// Returns the same reading every time. Used for demos and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedSensor {
    reading: ResourceReading,
}

impl FixedSensor {
    pub fn new(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            reading: ResourceReading {
                cpu_percent: cpu_percent.clamp(0.0, 100.0),
                memory_percent: memory_percent.clamp(0.0, 100.0),
            },
        }
    }
}

impl MetricSource for FixedSensor {
    fn sample(&self) -> Result<ResourceReading> {
        Ok(self.reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_sensor_repeats_its_reading() {
        let s = FixedSensor::new(42.0, 10.0);
        for _ in 0..3 {
            let r = s.sample().unwrap();
            assert_eq!(r.cpu_percent, 42.0);
            assert_eq!(r.memory_percent, 10.0);
        }
    }

    #[test]
    fn fixed_sensor_clamps() {
        let r = FixedSensor::new(250.0, -1.0).sample().unwrap();
        assert_eq!(r.cpu_percent, 100.0);
        assert_eq!(r.memory_percent, 0.0);
    }

    #[test]
    fn system_sensor_reads_percentages() {
        let sensor = SystemSensor::new(Duration::from_millis(50));
        // Some sandboxes hide /proc; only check ranges when a reading exists.
        if let Ok(r) = sensor.sample() {
            assert!((0.0..=100.0).contains(&r.cpu_percent));
            assert!((0.0..=100.0).contains(&r.memory_percent));
        }
    }
}
