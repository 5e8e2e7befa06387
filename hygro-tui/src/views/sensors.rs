//! Sensor table with live readings.

use crate::state::App;
use crate::theme::{humidity_color, temperature_color};
use crate::widgets::DetailPanel;
use hygro_core::{influx, SensorClient};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(config) = app.device.config.as_ref() else {
        super::render_not_loaded(f, app, area, "Sensors");
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let rows: Vec<Row> = config
        .ifx_clients
        .iter()
        .enumerate()
        .map(|(i, sensor)| sensor_row(app, i, sensor))
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["#", "Name", "Address", "Temp", "RH"])
            .style(Style::default().fg(app.theme.primary).add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title(format!("Sensors ({}/{})", config.ifx_clients.len(), hygro_core::MAX_SENSORS))
            .borders(Borders::ALL),
    )
    .highlight_style(Style::default().bg(app.theme.bg_highlight).fg(app.theme.primary));

    let mut state = TableState::default();
    state.select(app.selected);
    f.render_stateful_widget(table, chunks[0], &mut state);

    let label = Style::default().fg(app.theme.secondary);
    let mut detail = DetailPanel::new("Details", label);
    if let Some(sensor) = app.selected_sensor() {
        let octets = sensor
            .addr
            .octets()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":");
        detail = detail
            .field("Name", sensor.name.clone())
            .field("Address", octets)
            .field("Temperature", reading(sensor.t, "°C"))
            .field("Humidity", reading(sensor.h, "%"))
            .field(
                "Line",
                influx::preview(config, sensor).unwrap_or_else(|| "(no reading yet)".to_string()),
            );
    }
    detail.render(f, chunks[1]);
}

fn sensor_row<'a>(app: &App, index: usize, sensor: &'a SensorClient) -> Row<'a> {
    let temp = match sensor.t {
        Some(t) => Span::styled(format!("{:.1}", t), Style::default().fg(temperature_color(t, &app.theme))),
        None => Span::styled("--", Style::default().fg(app.theme.text_dim)),
    };
    let humidity = match sensor.h {
        Some(h) => Span::styled(format!("{:.1}", h), Style::default().fg(humidity_color(h, &app.theme))),
        None => Span::styled("--", Style::default().fg(app.theme.text_dim)),
    };
    Row::new(vec![
        Cell::from((index + 1).to_string()),
        Cell::from(sensor.name.as_str()),
        Cell::from(sensor.addr.to_string()),
        Cell::from(temp),
        Cell::from(humidity),
    ])
}

fn reading(value: Option<f32>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1} {}", v, unit),
        None => "--".to_string(),
    }
}
