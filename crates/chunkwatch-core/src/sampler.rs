//! Continuous background sampler.
//!
//! Appends one reading to the shared series per interval for as long as the
//! supplied `is_active` predicate holds. There is no cancellation signal
//! beyond that predicate: the loop polls it before sampling, before appending
//! and after every sleep, so it stops within one interval of the predicate
//! turning false. The thread is daemon-style; callers usually detach it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::error::Result;
use crate::sensor::MetricSource;
use crate::series::SharedSeries;

pub struct ContinuousSampler {
    source: Arc<dyn MetricSource>,
    series: Arc<SharedSeries>,
    interval: Duration,
}

impl ContinuousSampler {
    pub fn new(source: Arc<dyn MetricSource>, series: Arc<SharedSeries>, interval: Duration) -> Self {
        Self {
            source,
            series,
            interval,
        }
    }

    /// Start sampling on a background thread until `is_active()` returns false.
    pub fn start<F>(self, is_active: F) -> Result<SamplerHandle>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("chunkwatch-sampler".into())
            .spawn(move || self.run(is_active))?;
        Ok(SamplerHandle { handle })
    }

    fn run<F: Fn() -> bool>(self, is_active: F) -> u64 {
        debug!("sampler started ({}ms interval)", self.interval.as_millis());
        let mut appended = 0u64;
        while is_active() {
            match self.source.sample() {
                // The reading may have taken a while; re-check before appending.
                Ok(r) if is_active() => {
                    self.series.record(r.cpu_percent);
                    appended += 1;
                }
                Ok(_) => break,
                Err(e) => warn!("sampler: skipping sample: {e}"),
            }
            thread::sleep(self.interval);
        }
        debug!("sampler stopped after {appended} samples");
        appended
    }
}

/// Handle to a running sampler thread.
pub struct SamplerHandle {
    handle: JoinHandle<u64>,
}

impl SamplerHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit; returns the number of samples it appended.
    pub fn join(self) -> u64 {
        self.handle.join().unwrap_or(0)
    }

    /// Let the loop wind down on its own. Process exit does not wait for it.
    pub fn detach(self) {
        drop(self.handle);
    }
}
