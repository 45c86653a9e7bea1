// crates/xornet-client/src/components/status_bar.rs

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

pub fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let heartbeat = match app.status.last_heartbeat {
        Some(at) => format!("{:.1}s ago", at.elapsed().as_secs_f64()),
        None => "never".to_string(),
    };

    let mut spans = vec![
        Span::styled("[Q]", Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        Span::raw("uit "),
        Span::styled("[R]", Style::default().fg(Color::Cyan)),
        Span::raw("econnect "),
        Span::styled("[L]", Style::default().fg(Color::Red)),
        Span::raw("ogout | "),
        Span::raw(format!("session {} ", app.status.generation)),
        Span::raw(format!("| heartbeat {} ", heartbeat)),
        Span::raw(format!("| buffered {} ", app.status.buffered)),
        Span::raw(format!("| reconnects {}", app.status.reconnects)),
    ];

    if let Some(at) = app.last_refresh {
        spans.push(Span::raw(format!(" | {}", at.format("%H:%M:%S"))));
    }

    if let Some(msg) = &app.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg.clone(), Style::default().fg(Color::Yellow)));
    }

    let border = if app.is_live() { Color::Green } else { Color::Red };
    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(border)))
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}
