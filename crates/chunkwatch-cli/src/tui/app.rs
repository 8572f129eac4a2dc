//! Terminal render surface.
//!
//! The renderer drives the ticks; this surface owns the terminal, keeps the
//! last frame for redraws and turns key presses into close/pause requests.

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use chunkwatch_core::{PipelineError, RenderSurface, Result, WindowFrame};

/// Longest single wait on terminal input inside one tick.
const POLL_SLICE: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// What the UI draws. Kept separate from the terminal so it can be tested.
#[derive(Debug, Default)]
pub struct View {
    title: String,
    frame: Option<WindowFrame>,
    idle_status: String,
    paused: bool,
    ticks: u64,
}

impl View {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            idle_status: "waiting for samples".to_string(),
            ..Default::default()
        }
    }

    /// Store a new frame unless paused. Paused views keep showing the old one.
    pub fn update_frame(&mut self, frame: &WindowFrame) {
        self.ticks += 1;
        if !self.paused {
            self.frame = Some(frame.clone());
        }
    }

    pub fn update_idle(&mut self, status: &str) {
        self.ticks += 1;
        self.idle_status = status.to_string();
    }

    /// Returns false when the key asks to quit.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('p') => self.paused = !self.paused,
            _ => {}
        }
        true
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn frame(&self) -> Option<&WindowFrame> {
        self.frame.as_ref()
    }

    pub fn idle_status(&self) -> &str {
        &self.idle_status
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

// ---------------------------------------------------------------------------
// TerminalSurface
// ---------------------------------------------------------------------------

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub struct TerminalSurface {
    terminal: Option<Term>,
    view: View,
}

fn surface_err(e: io::Error) -> PipelineError {
    PipelineError::RenderSurface(e.to_string())
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            terminal: None,
            view: View::default(),
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Err(PipelineError::RenderSurface("terminal not open".into()));
        };
        let view = &self.view;
        terminal
            .draw(|f| super::ui::draw(f, view))
            .map_err(surface_err)?;
        Ok(())
    }

    fn restore(&mut self) {
        if let Some(mut terminal) = self.terminal.take() {
            release_panic_hook();
            let _ = disable_raw_mode();
            let _ = execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                crossterm::cursor::Show
            );
        }
    }
}

/// Remove the terminal-restoring panic hook installed by `open`.
///
/// `take_hook` panics on a panicking thread, so during unwinding the hook is
/// left in place (it has already restored the terminal). Returns whether the
/// hook was removed.
fn release_panic_hook() -> bool {
    if std::thread::panicking() {
        return false;
    }
    let _ = std::panic::take_hook();
    true
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for TerminalSurface {
    fn open(&mut self, title: &str) -> Result<()> {
        if self.terminal.is_some() {
            return Ok(());
        }
        enable_raw_mode().map_err(surface_err)?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(surface_err(e));
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(t) => t,
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(surface_err(e));
            }
        };

        // Restore the terminal before the panic message is printed.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        self.terminal = Some(terminal);
        self.view = View::new(title);
        self.redraw()
    }

    fn draw_series(&mut self, frame: &WindowFrame) -> Result<()> {
        self.view.update_frame(frame);
        self.redraw()
    }

    fn draw_idle(&mut self, status: &str) -> Result<()> {
        self.view.update_idle(status);
        self.redraw()
    }

    fn is_open(&self) -> bool {
        self.terminal.is_some()
    }

    fn wait_tick(&mut self, interval: Duration) -> Result<()> {
        let deadline = Instant::now() + interval;
        while self.terminal.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if event::poll(remaining.min(POLL_SLICE)).map_err(surface_err)?
                && let Event::Key(key) = event::read().map_err(surface_err)?
                && key.kind == KeyEventKind::Press
            {
                if self.view.handle_key(key.code) {
                    self.redraw()?;
                } else {
                    log::info!("display closed by user");
                    self.restore();
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.restore();
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn frame(cpu: f64) -> WindowFrame {
        WindowFrame {
            xs: vec![0.0, 1.0],
            ys: vec![cpu, cpu],
            x_range: (0.0, 1.0),
            y_range: (0.0, 100.0),
            latest_cpu: cpu,
            elapsed_secs: 1.0,
            status: format!("CPU {cpu:.1}%"),
        }
    }

    #[test]
    fn quit_keys_end_the_view() {
        let mut view = View::new("t");
        assert!(!view.handle_key(KeyCode::Char('q')));
        assert!(!view.handle_key(KeyCode::Esc));
        assert!(view.handle_key(KeyCode::Char('x')));
    }

    #[test]
    fn pause_freezes_the_frame() {
        let mut view = View::new("t");
        view.update_frame(&frame(10.0));
        assert!(view.handle_key(KeyCode::Char('p')));
        assert!(view.is_paused());

        view.update_frame(&frame(90.0));
        assert_eq!(view.frame().unwrap().latest_cpu, 10.0);
        assert_eq!(view.ticks(), 2);

        view.handle_key(KeyCode::Char('p'));
        view.update_frame(&frame(90.0));
        assert_eq!(view.frame().unwrap().latest_cpu, 90.0);
    }

    #[test]
    fn idle_status_is_kept() {
        let mut view = View::new("CPU usage (live)");
        view.update_idle("waiting for samples (1)");
        assert_eq!(view.idle_status(), "waiting for samples (1)");
        assert_eq!(view.title(), "CPU usage (live)");
        assert!(view.frame().is_none());
    }

    struct ReleaseOnDrop(Arc<AtomicBool>);

    impl Drop for ReleaseOnDrop {
        fn drop(&mut self) {
            self.0.store(release_panic_hook(), Ordering::SeqCst);
        }
    }

    #[test]
    fn hook_release_during_unwind_does_not_abort() {
        let released = Arc::new(AtomicBool::new(true));
        let guard = ReleaseOnDrop(Arc::clone(&released));
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = guard;
            panic!("render loop failed");
        }));
        assert!(outcome.is_err());
        assert!(!released.load(Ordering::SeqCst));
    }

    #[test]
    fn hook_release_outside_unwind_removes_hook() {
        assert!(release_panic_hook());
    }

    #[test]
    fn unopened_surface_is_closed() {
        let surface = TerminalSurface::new();
        assert!(!surface.is_open());
    }
}
