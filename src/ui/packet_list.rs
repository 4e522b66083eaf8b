//! Packet table widget with detail panel.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::app::App;
use crate::packet::PacketKind;

/// Render the packets area: table + detail panel
pub fn render_packet_list(frame: &mut Frame, area: Rect, app: &App) {
    let has_selection = app
        .selected_packet
        .map(|i| i < app.store().len())
        .unwrap_or(false);

    let chunks = if has_selection {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),    // Table (flexible, takes remaining)
                Constraint::Length(8), // Detail panel (fixed height)
            ])
            .split(area)
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6)])
            .split(area)
    };

    render_table(frame, chunks[0], app);

    if has_selection && chunks.len() > 1 {
        render_detail_panel(frame, chunks[1], app);
    }
}

fn kind_style(kind: PacketKind) -> Style {
    match kind {
        PacketKind::Idle => Style::default().fg(Color::DarkGray),
        PacketKind::Broadcast => Style::default().fg(Color::Yellow),
        PacketKind::Locomotive => Style::default().fg(Color::Cyan),
        PacketKind::Accessory => Style::default().fg(Color::Magenta),
        PacketKind::Extended => Style::default().fg(Color::Blue),
        PacketKind::Other => Style::default().fg(Color::DarkGray),
    }
}

fn checksum_style(status: &str) -> Style {
    match status {
        "OK" => Style::default().fg(Color::Green),
        "FAIL" => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::DarkGray),
    }
}

/// Render the compact packet table
fn render_table(frame: &mut Frame, area: Rect, app: &App) {
    let header_cells = ["#", "Bytes", "Bits", "Kind", "Chk", "Count", "Last Seen"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD)));

    let header = Row::new(header_cells).style(Style::default()).height(1);

    let rows = app.store().entries().iter().enumerate().map(|(idx, entry)| {
        let packet = &entry.packet;
        Row::new(vec![
            Cell::from(format!("{:02}", idx + 1)),
            Cell::from(packet.data_hex()).style(Style::default().fg(Color::Yellow)),
            Cell::from(format!("{}", packet.bit_count())),
            Cell::from(packet.kind().to_string()).style(kind_style(packet.kind())),
            Cell::from(packet.checksum_status()).style(checksum_style(packet.checksum_status())),
            Cell::from(format!("{}", entry.times_received)),
            Cell::from(entry.last_seen_short()),
        ])
        .height(1)
    });

    let widths = [
        Constraint::Length(4),  // #
        Constraint::Length(20), // Bytes (up to 6 hex pairs)
        Constraint::Length(5),  // Bits
        Constraint::Length(10), // Kind
        Constraint::Length(5),  // Chk
        Constraint::Length(7),  // Count
        Constraint::Length(10), // Last Seen
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Packets "),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    state.select(app.selected_packet);

    if app.scroll_offset > 0 && app.selected_packet.is_some() {
        *state.offset_mut() = app.scroll_offset;
    }

    frame.render_stateful_widget(table, area, &mut state);
}

/// Render the detail panel for the selected packet
fn render_detail_panel(frame: &mut Frame, area: Rect, app: &App) {
    let entry = match app.selected_packet {
        Some(idx) if idx < app.store().len() => &app.store().entries()[idx],
        _ => return,
    };
    let packet = &entry.packet;

    let label_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(Color::White);
    let good_style = Style::default().fg(Color::Green);
    let bad_style = Style::default().fg(Color::Red);

    let checksum_span = match packet.checksum_ok() {
        Some(true) => Span::styled("OK ✓", good_style),
        Some(false) => Span::styled("FAIL ✗", bad_style),
        None => Span::styled("-", Style::default().fg(Color::DarkGray)),
    };

    let mut lines = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(" Bytes:     ", label_style),
        Span::styled(packet.data_hex(), Style::default().fg(Color::Yellow)),
        Span::styled(
            format!("  ({} bits)", packet.bit_count()),
            Style::default().fg(Color::DarkGray),
        ),
    ]));

    lines.push(Line::from(vec![
        Span::styled(" Kind:      ", label_style),
        Span::styled(packet.kind().to_string(), kind_style(packet.kind())),
        Span::styled("  Checksum: ", label_style),
        checksum_span,
    ]));

    lines.push(Line::from(vec![
        Span::styled(" Received:  ", label_style),
        Span::styled(format!("{} time(s)", entry.times_received), value_style),
    ]));

    lines.push(Line::from(vec![
        Span::styled(" First:     ", label_style),
        Span::styled(
            entry.first_seen.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            value_style,
        ),
    ]));

    lines.push(Line::from(vec![
        Span::styled(" Last:      ", label_style),
        Span::styled(
            entry.last_seen.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            value_style,
        ),
    ]));

    let title = format!(" Packet — {} ", packet.kind());

    let detail = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(kind_style(packet.kind()))
                .title(title),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(detail, area);
}
