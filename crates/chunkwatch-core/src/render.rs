//! Sliding-window rendering of the shared CPU series.
//!
//! The renderer drives the main thread: each tick it snapshots the series,
//! converts timestamps to seconds since the first sample, clips the X axis to
//! the trailing window `[max(0, T - W), T]` and hands the frame to a
//! [`RenderSurface`]. Stored data is never trimmed; only the view is clipped.
//!
//! Whether the surface is still open is published through a [`SurfaceFlag`].
//! That flag is the only stop signal the background sampler listens to.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::Result;
use crate::series::{Sample, SharedSeries};
use crate::worker::ProgressEvent;

/// Y axis bounds for CPU percentages.
pub const CPU_RANGE: (f64, f64) = (0.0, 100.0);

// ---------------------------------------------------------------------------
// SurfaceFlag
// ---------------------------------------------------------------------------

/// Shared open/closed state of the display surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceFlag(Arc<AtomicBool>);

impl SurfaceFlag {
    /// A new flag, initially closed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set_open(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn close(&self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// WindowFrame
// ---------------------------------------------------------------------------

/// Everything a surface needs to draw one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    /// Seconds since the first sample, one per stored sample.
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub latest_cpu: f64,
    pub elapsed_secs: f64,
    pub status: String,
}

impl WindowFrame {
    /// Points inside the visible X range, plus the last point before it so a
    /// line chart still reaches the left edge.
    pub fn visible_points(&self) -> Vec<(f64, f64)> {
        let (lo, hi) = self.x_range;
        let first = self.xs.partition_point(|&x| x < lo).saturating_sub(1);
        self.xs[first..]
            .iter()
            .zip(&self.ys[first..])
            .filter(|&(&x, _)| x <= hi)
            .map(|(&x, &y)| (x, y))
            .collect()
    }
}

/// Trailing window of width `window` ending at `last`, clamped at zero.
pub fn visible_range(last: f64, window: f64) -> (f64, f64) {
    ((last - window).max(0.0), last)
}

/// Build the frame for a snapshot. `None` while fewer than two samples exist.
pub fn compute_frame(samples: &[Sample], window: Duration) -> Option<WindowFrame> {
    if samples.len() < 2 {
        return None;
    }
    let origin = samples[0].at();
    let xs: Vec<f64> = samples.iter().map(|s| s.seconds_since(origin)).collect();
    let ys: Vec<f64> = samples.iter().map(Sample::cpu_percent).collect();
    let last = xs[xs.len() - 1];
    let latest_cpu = ys[ys.len() - 1];

    Some(WindowFrame {
        x_range: visible_range(last, window.as_secs_f64()),
        y_range: CPU_RANGE,
        latest_cpu,
        elapsed_secs: last,
        status: format!("CPU {latest_cpu:.1}%  elapsed {last:.1}s"),
        xs,
        ys,
    })
}

// ---------------------------------------------------------------------------
// RenderSurface
// ---------------------------------------------------------------------------

/// Drawing backend used by [`WindowRenderer`].
///
/// Any error returned from a surface is treated as the surface closing.
pub trait RenderSurface {
    fn open(&mut self, title: &str) -> Result<()>;

    fn draw_series(&mut self, frame: &WindowFrame) -> Result<()>;

    /// Draw a frame without a series (fewer than two samples so far).
    fn draw_idle(&mut self, status: &str) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Block for up to one tick, handling any input the surface receives.
    fn wait_tick(&mut self, interval: Duration) -> Result<()>;

    fn close(&mut self);
}

// ---------------------------------------------------------------------------
// WindowRenderer
// ---------------------------------------------------------------------------

/// Counters from a finished render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderReport {
    pub ticks: u64,
    pub frames_drawn: u64,
}

pub struct WindowRenderer {
    series: Arc<SharedSeries>,
    flag: SurfaceFlag,
    tick: Duration,
    window: Duration,
    progress: Option<Receiver<ProgressEvent>>,
    last_progress: Option<ProgressEvent>,
}

impl WindowRenderer {
    pub fn new(series: Arc<SharedSeries>, tick: Duration, window: Duration) -> Self {
        Self {
            series,
            flag: SurfaceFlag::new(),
            tick,
            window,
            progress: None,
            last_progress: None,
        }
    }

    /// Fold worker progress into the status line.
    pub fn with_progress(mut self, rx: Receiver<ProgressEvent>) -> Self {
        self.progress = Some(rx);
        self
    }

    /// Flag that reports whether the surface is still open.
    pub fn flag(&self) -> SurfaceFlag {
        self.flag.clone()
    }

    pub fn is_open(&self) -> bool {
        self.flag.is_open()
    }

    /// Open the surface and publish it as open.
    pub fn open<S: RenderSurface + ?Sized>(&mut self, surface: &mut S, title: &str) -> Result<()> {
        surface.open(title)?;
        self.flag.set_open();
        info!("render surface open: {title}");
        Ok(())
    }

    fn status_suffix(&mut self) -> String {
        if let Some(rx) = &self.progress {
            // Latest event wins.
            if let Some(event) = rx.try_iter().last() {
                self.last_progress = Some(event);
            }
        }
        match self.last_progress {
            Some(p) if p.chunk == p.total => format!("  processing done ({} chunks)", p.total),
            Some(p) => format!("  chunk {}/{}", p.chunk, p.total),
            None => String::new(),
        }
    }

    /// Draw one tick. Returns whether a series frame (as opposed to an idle
    /// frame) was drawn.
    pub fn render_once<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> Result<bool> {
        let snapshot = self.series.snapshot();
        let suffix = self.status_suffix();
        match compute_frame(&snapshot, self.window) {
            Some(mut frame) => {
                frame.status.push_str(&suffix);
                debug!(
                    "tick: {} samples, x range [{:.1}, {:.1}]",
                    snapshot.len(),
                    frame.x_range.0,
                    frame.x_range.1
                );
                surface.draw_series(&frame)?;
                Ok(true)
            }
            None => {
                let status = format!("waiting for samples ({}){suffix}", snapshot.len());
                surface.draw_idle(&status)?;
                Ok(false)
            }
        }
    }

    /// Tick until the surface closes (or the flag is closed elsewhere).
    ///
    /// Never blocks on producers: each tick only copies the series. Surface
    /// errors are logged and end the loop as if the user closed the display.
    pub fn render_loop<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> RenderReport {
        let mut report = RenderReport::default();

        while self.flag.is_open() && surface.is_open() {
            report.ticks += 1;
            match self.render_once(surface) {
                Ok(true) => report.frames_drawn += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("render surface failed, closing: {e}");
                    break;
                }
            }
            if let Err(e) = surface.wait_tick(self.tick) {
                warn!("render surface failed, closing: {e}");
                break;
            }
        }

        self.flag.close();
        surface.close();
        info!(
            "render loop finished after {} ticks ({} frames)",
            report.ticks, report.frames_drawn
        );
        report
    }
}
