//! Raw configuration document as served by the device.

use crate::state::App;
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    if app.device.raw.is_empty() {
        super::render_not_loaded(f, app, area, "Raw");
        return;
    }
    let paragraph = Paragraph::new(app.device.raw.as_str())
        .block(Block::default().title("/api/conf.json").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}
