// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};

/// Renders batch-wide counts and a gauge of the probe pass rate once a batch has finished.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Pass rate
            Constraint::Length(1), // Gauge
            Constraint::Length(1),
            Constraint::Min(0), // Counts
        ])
        .split(area);

    if !matches!(app.state, AppState::Finished) {
        return;
    }

    let summary = &app.summary;
    let rate = summary.pass_rate();
    let rate_style = match rate {
        100 => Style::default().fg(Color::Green),
        50..=99 => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Red),
    };

    let rate_text = Text::from(vec![
        Line::from("Probes passed".bold()),
        Line::from(format!("{rate}%")).style(rate_style),
    ]);
    frame.render_widget(Paragraph::new(rate_text).alignment(Alignment::Center), summary_chunks[0]);
    frame.render_widget(Gauge::default().percent(rate).label("").style(rate_style), summary_chunks[1]);

    let counts = Text::from(vec![
        Line::from(vec![Span::raw("Targets:  "), Span::raw(summary.targets.to_string())]),
        Line::from(vec![
            Span::raw("Passed:   "),
            Span::styled(summary.probes_passed.to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw("Failed:   "),
            Span::styled(summary.probes_failed.to_string(), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::raw("Degraded: "),
            Span::styled(summary.degraded_targets.to_string(), Style::default().fg(Color::Red)),
        ]),
    ]);
    frame.render_widget(Paragraph::new(counts), summary_chunks[3]);
}
