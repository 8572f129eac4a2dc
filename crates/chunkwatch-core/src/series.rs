//! Append-only CPU time series shared between producers and the renderer.
//!
//! Two producers append (the processing worker and the continuous sampler),
//! one consumer reads whole snapshots. Every operation takes the internal
//! lock for the duration of a single push or a single copy, so a reader can
//! never observe a half-written [`Sample`] and no append is ever lost.
//! Nothing is evicted; windowing happens at render time only.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// One (timestamp, cpu%) observation. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    at: Instant,
    cpu_percent: f64,
}

impl Sample {
    /// Create a sample. CPU values are clamped into `[0, 100]`; NaN maps to 0.
    pub fn new(at: Instant, cpu_percent: f64) -> Self {
        let cpu_percent = if cpu_percent.is_nan() {
            0.0
        } else {
            cpu_percent.clamp(0.0, 100.0)
        };
        Self { at, cpu_percent }
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    pub fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }

    /// Seconds elapsed since `origin` (zero if `origin` is later).
    pub fn seconds_since(&self, origin: Instant) -> f64 {
        self.at.saturating_duration_since(origin).as_secs_f64()
    }
}

/// Thread-safe, growth-only sequence of [`Sample`]s in chronological order.
#[derive(Debug, Default)]
pub struct SharedSeries {
    samples: Mutex<Vec<Sample>>,
}

impl SharedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    // Append-only data: a panic in another holder cannot leave the Vec
    // half-updated, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<Sample>> {
        match self.samples.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append a sample to the end of the series.
    ///
    /// A sample older than the current tail (its producer read the clock
    /// before a competing producer appended) is moved up to the tail's
    /// timestamp so the series stays non-decreasing.
    pub fn append(&self, sample: Sample) {
        let mut samples = self.lock();
        let sample = match samples.last() {
            Some(tail) if sample.at < tail.at => Sample::new(tail.at, sample.cpu_percent),
            _ => sample,
        };
        samples.push(sample);
    }

    /// Stamp a reading with the current instant and append it atomically.
    pub fn record(&self, cpu_percent: f64) -> Sample {
        let mut samples = self.lock();
        let sample = Sample::new(Instant::now(), cpu_percent);
        samples.push(sample);
        sample
    }

    /// Copy of every sample appended so far, in append order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.lock().last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn sample_clamps_out_of_range_cpu() {
        let now = Instant::now();
        assert_eq!(Sample::new(now, 120.0).cpu_percent(), 100.0);
        assert_eq!(Sample::new(now, -3.0).cpu_percent(), 0.0);
        assert_eq!(Sample::new(now, f64::NAN).cpu_percent(), 0.0);
        assert_eq!(Sample::new(now, 42.5).cpu_percent(), 42.5);
    }

    #[test]
    fn append_preserves_order() {
        let series = SharedSeries::new();
        let t0 = Instant::now();
        for i in 0..5 {
            series.append(Sample::new(t0 + Duration::from_millis(i * 10), i as f64));
        }
        let snap = series.snapshot();
        assert_eq!(snap.len(), 5);
        for (i, s) in snap.iter().enumerate() {
            assert_eq!(s.cpu_percent(), i as f64);
        }
    }

    #[test]
    fn late_sample_is_raised_to_tail_timestamp() {
        let series = SharedSeries::new();
        let t0 = Instant::now();
        series.append(Sample::new(t0 + Duration::from_secs(2), 10.0));
        series.append(Sample::new(t0, 20.0));

        let snap = series.snapshot();
        assert_eq!(snap[1].at(), snap[0].at());
        assert_eq!(snap[1].cpu_percent(), 20.0);
    }

    #[test]
    fn snapshot_is_idempotent_without_appends() {
        let series = SharedSeries::new();
        series.record(12.0);
        series.record(34.0);
        assert_eq!(series.snapshot(), series.snapshot());
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let series = SharedSeries::new();
        series.record(1.0);
        let before = series.snapshot();
        series.record(2.0);
        assert_eq!(before.len(), 1);
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().map(|s| s.cpu_percent()), Some(2.0));
    }

    #[test]
    fn concurrent_producers_lose_nothing_and_stay_ordered() {
        const PER_PRODUCER: usize = 2_000;
        let series = Arc::new(SharedSeries::new());

        let producers: Vec<_> = [25.0, 75.0]
            .into_iter()
            .map(|cpu| {
                let series = Arc::clone(&series);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        if i % 2 == 0 {
                            series.record(cpu);
                        } else {
                            series.append(Sample::new(Instant::now(), cpu));
                        }
                    }
                })
            })
            .collect();

        // Read concurrently with the producers.
        let reader = {
            let series = Arc::clone(&series);
            thread::spawn(move || {
                for _ in 0..200 {
                    let snap = series.snapshot();
                    assert!(snap.windows(2).all(|w| w[0].at() <= w[1].at()));
                    assert!(
                        snap.iter()
                            .all(|s| s.cpu_percent() == 25.0 || s.cpu_percent() == 75.0)
                    );
                }
            })
        };

        for p in producers {
            p.join().unwrap();
        }
        reader.join().unwrap();

        let snap = series.snapshot();
        assert_eq!(snap.len(), 2 * PER_PRODUCER);
        assert!(snap.windows(2).all(|w| w[0].at() <= w[1].at()));
        let low = snap.iter().filter(|s| s.cpu_percent() == 25.0).count();
        assert_eq!(low, PER_PRODUCER);
    }
}
