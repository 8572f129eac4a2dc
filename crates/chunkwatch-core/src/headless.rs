//! Headless render surface.
//!
//! Stays open for a fixed duration, or until an external stop flag is set
//! (the CLI wires Ctrl+C to it). Frames are logged instead of drawn.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::info;

use crate::error::{PipelineError, Result};
use crate::render::{RenderSurface, WindowFrame};

pub struct TimedSurface {
    open_for: Option<Duration>,
    opened_at: Option<Instant>,
    stop: Arc<AtomicBool>,
    closed: bool,
    frames_drawn: u64,
    last_frame: Option<WindowFrame>,
}

impl TimedSurface {
    /// Open for `open_for`, or indefinitely (until stopped) when `None`.
    pub fn new(open_for: Option<Duration>) -> Self {
        Self {
            open_for,
            opened_at: None,
            stop: Arc::new(AtomicBool::new(false)),
            closed: false,
            frames_drawn: 0,
            last_frame: None,
        }
    }

    /// Setting the returned flag to `true` closes the surface.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn last_frame(&self) -> Option<&WindowFrame> {
        self.last_frame.as_ref()
    }

    fn remaining(&self) -> Option<Duration> {
        let opened = self.opened_at?;
        self.open_for
            .map(|limit| limit.saturating_sub(opened.elapsed()))
    }
}

impl RenderSurface for TimedSurface {
    fn open(&mut self, title: &str) -> Result<()> {
        if self.closed {
            return Err(PipelineError::RenderSurface("surface already closed".into()));
        }
        self.opened_at = Some(Instant::now());
        match self.open_for {
            Some(d) => info!("{title} (headless, {:.1}s)", d.as_secs_f64()),
            None => info!("{title} (headless, until interrupted)"),
        }
        Ok(())
    }

    fn draw_series(&mut self, frame: &WindowFrame) -> Result<()> {
        info!(
            "{}  window [{:.1}s, {:.1}s]",
            frame.status, frame.x_range.0, frame.x_range.1
        );
        self.frames_drawn += 1;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn draw_idle(&mut self, status: &str) -> Result<()> {
        info!("{status}");
        Ok(())
    }

    fn is_open(&self) -> bool {
        if self.closed || self.opened_at.is_none() || self.stop.load(Ordering::SeqCst) {
            return false;
        }
        self.remaining().is_none_or(|left| !left.is_zero())
    }

    fn wait_tick(&mut self, interval: Duration) -> Result<()> {
        let wait = match self.remaining() {
            Some(left) => interval.min(left),
            None => interval,
        };
        std::thread::sleep(wait);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
