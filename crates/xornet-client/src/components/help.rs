// crates/xornet-client/src/components/help.rs

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem},
    Frame,
};

pub fn draw_help(f: &mut Frame, area: Rect) {
    // Clear the area first for the overlay
    f.render_widget(Clear, area);

    let entries = [
        ("↑/k", "Move Up", Color::White),
        ("↓/j", "Move Down", Color::White),
        ("S/s", "Cycle Sort Column", Color::Yellow),
        ("D/d", "Toggle Details Panel", Color::Cyan),
        ("R/r", "Reconnect If Disconnected", Color::Green),
        ("L/l", "Logout And Quit", Color::Red),
        ("F1", "Toggle Help", Color::Gray),
        ("Q/q", "Quit", Color::Gray),
    ];

    let items: Vec<ListItem> = entries
        .iter()
        .map(|(key, action, color)| {
            ListItem::new(Line::from(vec![
                Span::styled(*key, Style::default().fg(*color).add_modifier(Modifier::BOLD)),
                Span::raw(format!(" - {}", action)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::Black)),
    );

    f.render_widget(list, area);
}
