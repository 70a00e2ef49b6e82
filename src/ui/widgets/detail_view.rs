// src/ui/widgets/detail_view.rs

use crate::app::App;
use crate::core::models::TargetReport;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

/// Pretty JSON for a target, the same shape the batch report uses on the wire.
fn detail_lines(report: &TargetReport) -> Vec<Line<'static>> {
    match serde_json::to_string_pretty(report) {
        Ok(json) => json
            .lines()
            .map(|line| {
                let style = if line.trim_start().starts_with("\"error\"") {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                Line::styled(line.to_string(), style)
            })
            .collect(),
        Err(e) => vec![Line::styled(format!("Unable to render report: {e}"), Style::default().fg(Color::Red))],
    }
}

pub fn render_detail_view(frame: &mut Frame, app: &App, area: Rect) {
    let Some(report) = app.selected_report() else {
        let block = Block::default().borders(Borders::ALL).title("Report");
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Report: {}", report.domain));
    let paragraph = Paragraph::new(detail_lines(report))
        .block(block)
        .scroll((app.detail_scroll, 0));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ProbeKind, ProbeOutcome};
    use serde_json::json;

    #[test]
    fn failures_are_highlighted() {
        let mut report = TargetReport::new("example.com");
        report.record(ProbeKind::Status, ProbeOutcome::Success(json!({ "status": "UP" })));
        report.record(ProbeKind::Ssl, ProbeOutcome::failure("handshake failed"));

        let lines = detail_lines(&report);
        let red: Vec<String> = lines
            .iter()
            .filter(|line| line.style.fg == Some(Color::Red))
            .map(|line| line.to_string())
            .collect();

        assert!(lines.len() > 4);
        assert_eq!(red.len(), 1);
        assert!(red[0].contains("handshake failed"));
    }
}
