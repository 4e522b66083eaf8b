//! Command input widget.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, InputMode};

/// Render the command input line
pub fn render_command_line(frame: &mut Frame, area: Rect, app: &App) {
    let (input_text, mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (String::new(), "NORMAL", Style::default().fg(Color::Green)),
        InputMode::Command => (
            format!(":{}", app.command_input),
            "COMMAND",
            Style::default().fg(Color::Yellow),
        ),
        InputMode::LoadFileBrowser => (String::new(), "LOAD", Style::default().fg(Color::Cyan)),
        InputMode::Help => (String::new(), "HELP", Style::default().fg(Color::Cyan)),
    };

    let input_line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode_text),
            mode_style.add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::raw(input_text),
        Span::styled(
            if app.input_mode == InputMode::Command {
                "█"
            } else {
                ""
            },
            Style::default(),
        ),
    ]);

    let input = Paragraph::new(input_line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("input"),
    );

    frame.render_widget(input, area);
}
