// crates/xornet-client/src/ui.rs

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use xornet_core::ConnectionState;

use crate::app::App;
use crate::components::{
    help::draw_help,
    machine_details::draw_machine_details,
    machine_table::draw_machine_table,
    status_bar::draw_status_bar,
};
use xornet_client::format::format_mbps;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Machines
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    draw_header(f, chunks[0], app);
    draw_main_content(f, chunks[1], app);
    draw_status_bar(f, chunks[2], app);

    if app.show_help {
        draw_help(f, centered_rect(50, 50, f.size()));
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
        ])
        .split(area);

    // Left: who and connection state
    let state_color = match app.status.state {
        ConnectionState::Live => Color::Green,
        ConnectionState::Connecting | ConnectionState::Authenticating => Color::Yellow,
        ConnectionState::Disconnected => Color::Red,
    };
    let who = app
        .me
        .as_ref()
        .map(|u| u.username.clone())
        .unwrap_or_else(|| "not logged in".to_string());

    let left_text = vec![
        Span::styled("xornet", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" - "),
        Span::raw(who),
        Span::raw(" "),
        Span::styled(app.status.state.as_str(), Style::default().fg(state_color)),
    ];
    let left_paragraph = Paragraph::new(Line::from(left_text))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(left_paragraph, header_chunks[0]);

    // Center: fleet totals
    let center_text = format!(
        "Machines: {} | ↓ {} Mbps | ↑ {} Mbps",
        app.machines.len(),
        format_mbps(Some(app.total_download())),
        format_mbps(Some(app.total_upload())),
    );
    let center_paragraph = Paragraph::new(center_text)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(center_paragraph, header_chunks[1]);

    // Right: help hints
    let right_paragraph = Paragraph::new("[F1]Help [S]ort [D]etails")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(right_paragraph, header_chunks[2]);
}

fn draw_main_content(f: &mut Frame, area: Rect, app: &App) {
    if !app.show_details {
        draw_machine_table(f, area, app);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    draw_machine_table(f, chunks[0], app);
    draw_machine_details(f, chunks[1], app);
}

/// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
