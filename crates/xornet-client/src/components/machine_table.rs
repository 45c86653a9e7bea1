// crates/xornet-client/src/components/machine_table.rs

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};
use xornet_core::Machine;

use crate::app::App;
use xornet_client::format::{format_mbps, format_percent, format_uptime};

pub fn draw_machine_table(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(vec!["Name", "CPU", "RAM", "↓ Mbps", "↑ Mbps", "Procs", "Uptime"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = app.machines.values().map(machine_row).collect();

    let widths = [
        Constraint::Percentage(28),
        Constraint::Percentage(10),
        Constraint::Percentage(10),
        Constraint::Percentage(12),
        Constraint::Percentage(12),
        Constraint::Percentage(10),
        Constraint::Percentage(18),
    ];

    let title = format!(" Machines (by {}) ", app.sort.label());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = TableState::default();
    if !app.machines.is_empty() {
        state.select(Some(app.selected));
    }
    f.render_stateful_widget(table, area, &mut state);
}

fn machine_row(machine: &Machine) -> Row<'static> {
    let data = machine.dynamic_data.as_ref();
    let cpu = data.and_then(|d| d.cau);
    let ram = data.and_then(|d| d.ram.as_ref()).and_then(|r| r.usage_percent());

    Row::new(vec![
        Cell::from(machine.display_name().to_string()),
        Cell::from(format_percent(cpu)).style(load_style(cpu)),
        Cell::from(format_percent(ram)).style(load_style(ram)),
        Cell::from(format_mbps(data.and_then(|d| d.td))),
        Cell::from(format_mbps(data.and_then(|d| d.tu))),
        Cell::from(
            data.and_then(|d| d.process_count)
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
        ),
        Cell::from(format_uptime(data.and_then(|d| d.host_uptime)).unwrap_or_else(|| "-".to_string())),
    ])
}

fn load_style(percent: Option<f64>) -> Style {
    match percent {
        Some(p) if p >= 90.0 => Style::default().fg(Color::Red),
        Some(p) if p >= 60.0 => Style::default().fg(Color::Yellow),
        Some(_) => Style::default().fg(Color::Green),
        None => Style::default().fg(Color::DarkGray),
    }
}
