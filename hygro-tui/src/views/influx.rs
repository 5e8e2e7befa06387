//! InfluxDB forwarding settings.

use crate::state::App;
use crate::widgets::DetailPanel;
use hygro_core::influx;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(config) = app.device.config.as_ref() else {
        super::render_not_loaded(f, app, area, "InfluxDB");
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(area);

    let dim = Style::default().fg(app.theme.text_dim);
    let or_unset = |value: &str| {
        if value.is_empty() {
            ("(unset)".to_string(), Some(dim))
        } else {
            (value.to_string(), None)
        }
    };

    let mut panel = DetailPanel::new("InfluxDB (UDP)", Style::default().fg(app.theme.secondary));
    for (label, value) in [
        ("Host", config.ifx_host.as_str()),
        ("Measurement", config.ifx_db.as_str()),
        ("Tag prefix", config.ifx_pfx.as_str()),
    ] {
        panel = match or_unset(value) {
            (text, Some(style)) => panel.styled_field(label, text, style),
            (text, None) => panel.field(label, text),
        };
    }
    panel = panel.field("Interval", format!("{} s", config.ifx_int));
    panel.render(f, chunks[0]);

    let items: Vec<ListItem> = config
        .ifx_clients
        .iter()
        .map(|sensor| match influx::preview(config, sensor) {
            Some(line) => ListItem::new(line),
            None => ListItem::new(format!("{}: waiting for a reading", sensor.name)).style(dim),
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .title("Line protocol preview")
            .borders(Borders::ALL),
    );
    f.render_widget(list, chunks[1]);
}
