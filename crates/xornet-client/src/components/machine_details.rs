// crates/xornet-client/src/components/machine_details.rs

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use xornet_client::format::{format_gib, format_percent, format_uptime, os_image_key};

pub fn draw_machine_details(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title(" Details ");

    let Some(machine) = app.selected_machine() else {
        let empty = Paragraph::new("Waiting for telemetry...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            machine.display_name().to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        field("uuid", machine.uuid.to_string()),
    ];

    if let Some(os) = &machine.os_name {
        let distro = os_image_key(os).unwrap_or("unknown");
        lines.push(field("os", format!("{} ({})", os, distro)));
    }

    if let Some(data) = &machine.dynamic_data {
        lines.push(field("cpu", format_percent(data.cau)));
        if let Some(speed) = data.cas {
            lines.push(field("cpu speed", format!("{:.0} MHz", speed)));
        }
        if let Some(ram) = &data.ram {
            lines.push(field(
                "ram",
                format!("{} / {}", format_gib(ram.used), format_gib(ram.total)),
            ));
        }
        if let Some(gpu) = &data.gpu {
            lines.push(field(
                "gpu",
                format!(
                    "{} {}",
                    gpu.brand.as_deref().unwrap_or("?"),
                    format_percent(gpu.gpu_usage)
                ),
            ));
        }
        if let Some(uptime) = format_uptime(data.host_uptime) {
            lines.push(field("host uptime", uptime));
        }
        if let Some(uptime) = format_uptime(data.reporter_uptime) {
            lines.push(field("reporter uptime", uptime));
        }
        if let Some(version) = &data.reporter_version {
            lines.push(field("reporter", version.clone()));
        }
        if let Some(country) = &data.country {
            lines.push(field("country", country.clone()));
        }
        if let Some(ip) = &data.public_ip {
            lines.push(field("public ip", ip.clone()));
        }
    }

    if let Some(at) = machine.updated_at {
        lines.push(field(
            "updated",
            at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string(),
        ));
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<16}", label), Style::default().fg(Color::Gray)),
        Span::raw(value),
    ])
}
