// src/ui/widgets/batch_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use crate::core::models::TargetReport;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// One row per target: the domain, then a mark for every probe it ran.
fn target_row(report: &TargetReport) -> ListItem<'_> {
    let domain_style = if report.is_degraded() {
        Style::default().fg(Color::Red).bold()
    } else {
        Style::default().bold()
    };

    let marks: Vec<Span> = report
        .outcomes()
        .flat_map(|(kind, outcome)| {
            let mark = if outcome.is_success() {
                Span::styled("✓", Style::default().fg(Color::Green))
            } else {
                Span::styled("✗", Style::default().fg(Color::Red))
            };
            [mark, Span::styled(format!("{kind} "), Style::default().fg(Color::DarkGray))]
        })
        .collect();

    ListItem::new(vec![
        Line::from(Span::styled(report.domain.as_str(), domain_style)),
        Line::from(marks),
    ])
}

pub fn render_batch_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Targets (↑ ↓)");

    let Some(report) = &app.batch_report else {
        let content = match app.state {
            AppState::Running => Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", SPINNER_CHARS[app.spinner_frame]), Style::default().fg(Color::Cyan)),
                Span::raw("Running probes..."),
            ])),
            _ => Paragraph::new("Results will appear here."),
        };
        frame.render_widget(content.alignment(Alignment::Center).block(block), area);
        return;
    };

    let items: Vec<ListItem> = report.iter().map(target_row).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(list, area, &mut app.results_state);
}
