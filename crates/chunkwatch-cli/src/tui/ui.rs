//! TUI rendering for the live CPU window.
//!
//! ┌──────────────────────────────────────────────┐
//! │  CPU usage (live)          tick #42          │
//! ├──────────────────────────────────────────────┤
//! │ 100 ┤        ⢀⡠⠤⠒⠒⠉⠉⠑⠒⠤⣀                      │
//! │     │  ⣀⠤⠒⠉              ⠉⠒⠢⢄⣀               │
//! │   0 ┼──────────────────────────────          │
//! │     2.0s                          12.0s      │
//! ├──────────────────────────────────────────────┤
//! │  CPU 37.5%  elapsed 12.0s  chunk 4/10        │
//! ├──────────────────────────────────────────────┤
//! │  p: pause   q: close display                 │
//! └──────────────────────────────────────────────┘

use super::app::View;
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, view: &View) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(8),    // chart
            Constraint::Length(3), // status
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], view);
    draw_chart(f, rows[1], view);
    draw_status(f, rows[2], view);
    draw_keys(f, rows[3], view);
}

fn draw_title(f: &mut Frame, area: Rect, view: &View) {
    let paused = if view.is_paused() { "  paused" } else { "" };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(
                format!(" {} ", view.title()),
                Style::default().bold().fg(Color::Cyan),
            ),
            Span::styled(
                format!("  tick #{}", view.ticks()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(paused.to_string(), Style::default().bold().fg(Color::Yellow)),
        ]));
    f.render_widget(block, area);
}

fn cpu_color(cpu: f64) -> Color {
    if cpu >= 80.0 {
        Color::Red
    } else if cpu >= 50.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn draw_chart(f: &mut Frame, area: Rect, view: &View) {
    let Some(frame) = view.frame() else {
        let block = Block::default().borders(Borders::ALL).title(" CPU % ");
        let p = Paragraph::new("Waiting for at least two samples...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let data = frame.visible_points();
    let (x_lo, x_hi) = frame.x_range;
    // A zero-width axis draws nothing.
    let x_hi = if x_hi > x_lo { x_hi } else { x_lo + 1.0 };
    let (y_lo, y_hi) = frame.y_range;

    let datasets = vec![
        Dataset::default()
            .name(format!("{:.1}%", frame.latest_cpu))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&data),
    ];

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(Line::from(vec![
            Span::raw(" CPU % "),
            Span::styled(
                format!("{:.1} ", frame.latest_cpu),
                Style::default().bold().fg(cpu_color(frame.latest_cpu)),
            ),
        ])))
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([x_lo, x_hi])
                .labels(vec![
                    Line::from(format!("{x_lo:.1}s")),
                    Line::from(format!("{x_hi:.1}s")),
                ]),
        )
        .y_axis(Axis::default().bounds([y_lo, y_hi]).labels(vec![
            Line::from(format!("{y_lo:.0}")),
            Line::from(format!("{:.0}", (y_lo + y_hi) / 2.0)),
            Line::from(format!("{y_hi:.0}")),
        ]));

    f.render_widget(chart, area);
}

fn draw_status(f: &mut Frame, area: Rect, view: &View) {
    let text = match view.frame() {
        Some(frame) if !view.is_paused() => frame.status.as_str(),
        Some(_) => "paused (press p to resume)",
        None => view.idle_status(),
    };
    let block = Block::default().borders(Borders::ALL).title(" Status ");
    let p = Paragraph::new(text)
        .style(Style::default().fg(Color::Yellow))
        .block(block);
    f.render_widget(p, area);
}

fn draw_keys(f: &mut Frame, area: Rect, view: &View) {
    let pause = if view.is_paused() { "resume" } else { "pause" };
    let bar = Paragraph::new(format!(
        " p: {pause}   q: close display (processing continues)"
    ))
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
