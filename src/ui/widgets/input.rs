// src/ui/widgets/input.rs
use crate::app::{App, AppState};
use crate::core::batch::MAX_BATCH_SIZE;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

/// Renders the target input. A rejected submission shows its message on the bottom border.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let mut input_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Targets (up to {MAX_BATCH_SIZE}, separated by spaces or commas)"));
    if let Some(notice) = &app.notice {
        input_block = input_block.title_bottom(Line::from(format!(" {notice} ")).red().bold());
    }

    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    if let AppState::Idle = app.state {
        frame.set_cursor_position(Position::new(
            area.x + app.input.chars().count() as u16 + 1,
            area.y + 1,
        ));
    }
}
