//! Main UI layout.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, LineState};
use crate::decoder::DiagCounter;

use super::command::render_command_line;
use super::packet_list::render_packet_list;
use super::status_bar::render_status_bar;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stats panel width (right side)
const STATS_PANEL_WIDTH: u16 = 26;

/// Entries visible in the load browser before scrolling
const BROWSER_VISIBLE: usize = 16;

const HELP_TEXT: &str = "\
  q        quit
  j / k    select next / previous packet
  g        play the built-in demo stream
  l        browse .tim captures for replay
  s        stop playback
  c        clear session (store + counters)
  e        export packet log as JSON
  :        command mode
  h        this help

  Commands:
    :q               quit
    :demo            play the demo stream
    :load [file]     replay a capture (browser if no file)
    :stop            stop playback
    :clear           clear session
    :export [name]   export packet log

  Captures are plain text: microsecond edge intervals
  separated by whitespace, '#' comments. Configuration
  lives in ~/.config/dccmon/config.ini.";

/// Draw the entire UI
pub fn draw_ui(frame: &mut Frame, app: &App) {
    let show_command = app.input_mode == InputMode::Command;

    let main_area = frame.area();
    let mut v_constraints = vec![
        Constraint::Length(3), // Header (full width)
        Constraint::Min(12),   // Middle: packet table + stats panel
        Constraint::Length(3), // Status bar (full width)
        Constraint::Length(1), // Help bar (full width)
    ];
    if show_command {
        v_constraints.insert(v_constraints.len() - 1, Constraint::Length(3));
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(v_constraints)
        .split(main_area);

    let mut idx = 0;
    render_header(frame, rows[idx], app);
    idx += 1;

    // Only the middle row is split: packets (left) | stats (right)
    let middle_row = rows[idx];
    let h_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(STATS_PANEL_WIDTH)])
        .split(middle_row);
    idx += 1;

    render_packet_list(frame, h_chunks[0], app);
    render_stats_panel(frame, h_chunks[1], app);

    render_status_bar(frame, rows[idx], app);
    idx += 1;

    if show_command {
        render_command_line(frame, rows[idx], app);
        idx += 1;
    }

    render_help_bar(frame, rows[idx], app);

    // Overlay widgets (rendered on top of everything else)
    if app.input_mode == InputMode::LoadFileBrowser {
        render_load_file_browser(frame, app);
    }
    if app.input_mode == InputMode::Help {
        render_help_overlay(frame, app);
    }
}

/// Render the header: title on the left, line state on the right
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let state_style = match app.line_state {
        LineState::Idle => Style::default().fg(Color::DarkGray),
        LineState::Playing => Style::default().fg(Color::Green),
    };

    let mut spans = vec![
        Span::styled(
            format!(" dccmon v{} ", VERSION),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("— DCC Signal Monitor", Style::default().fg(Color::DarkGray)),
        Span::raw("   "),
        Span::styled(
            format!(" {} ", app.line_state),
            state_style.add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(ref source) = app.source_name {
        spans.push(Span::styled(
            format!(" {}", source),
            Style::default().fg(Color::White),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" dccmon "),
    );
    frame.render_widget(header, area);
}

/// Render the decoder stats panel
fn render_stats_panel(frame: &mut Frame, area: Rect, app: &App) {
    let label_style = Style::default().fg(Color::DarkGray);
    let value_style = Style::default().fg(Color::White);

    let mut lines = Vec::new();
    for counter in DiagCounter::ALL {
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<10}", counter.label()), label_style),
            Span::styled(
                format!("{:>10}", app.decoder().diag(counter)),
                value_style,
            ),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled(format!(" {:<10}", "Dropped"), label_style),
        Span::styled(format!("{:>10}", app.store().dropped()), value_style),
    ]));
    lines.push(Line::default());

    let framer_state = if app.decoder().framer().in_data() {
        Span::styled("DATA", Style::default().fg(Color::Green))
    } else {
        Span::styled("SYNC", Style::default().fg(Color::DarkGray))
    };
    lines.push(Line::from(vec![
        Span::styled(format!(" {:<10}", "Framer"), label_style),
        Span::styled(format!("{:>6}", ""), label_style),
        framer_state,
    ]));

    let windows = app.decoder().windows();
    lines.push(Line::from(vec![
        Span::styled(format!(" {:<7}", "Short"), label_style),
        Span::styled(
            format!("{:>9}-{} µs", windows.short_min, windows.short_max),
            value_style,
        ),
    ]));
    lines.push(Line::from(vec![
        Span::styled(format!(" {:<7}", "Long"), label_style),
        Span::styled(
            format!("{:>9}-{} µs", windows.long_min, windows.long_max),
            value_style,
        ),
    ]));
    lines.push(Line::from(vec![
        Span::styled(format!(" {:<7}", "Pin"), label_style),
        Span::styled(format!("{:>12}", app.storage.config.pin), value_style),
    ]));

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" decoder "),
    );
    frame.render_widget(panel, area);
}

/// Render the one-line key hint bar
fn render_help_bar(frame: &mut Frame, area: Rect, app: &App) {
    let hints = match app.input_mode {
        InputMode::Normal => {
            " q quit │ g demo │ l load │ s stop │ c clear │ e export │ j/k select │ : cmd │ h help"
        }
        InputMode::Command => " Enter run │ Esc cancel",
        InputMode::LoadFileBrowser => " j/k select │ Enter replay │ Esc cancel",
        InputMode::Help => " j/k scroll │ Esc close",
    };
    let bar = Paragraph::new(Line::from(Span::styled(
        hints,
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(bar, area);
}

/// Render the capture file browser overlay
fn render_load_file_browser(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, (BROWSER_VISIBLE + 2) as u16, frame.area());
    frame.render_widget(Clear, area);

    let items: Vec<ListItem> = app
        .load_browser_entries
        .iter()
        .enumerate()
        .skip(app.load_browser_scroll)
        .take(BROWSER_VISIBLE)
        .map(|(idx, path)| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let style = if idx == app.load_browser_selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(format!(" {}", name), style)))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(
                " Load capture ({} found) ",
                app.load_browser_entries.len()
            )),
    );
    frame.render_widget(list, area);
}

/// Render the help overlay
fn render_help_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(64, 26, frame.area());
    frame.render_widget(Clear, area);

    let help = Paragraph::new(HELP_TEXT)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help "),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.overlay_scroll as u16, 0));
    frame.render_widget(help, area);
}

/// A centered rect of fixed size, clamped to the frame
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
