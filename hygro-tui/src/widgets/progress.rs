//! Gauge for an in-flight device transfer.

use crate::api_client::TransferProgress;
use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Gauge},
    Frame,
};

pub struct TransferGauge<'a> {
    pub title: &'a str,
    /// `None` while a job runs but no bytes have moved yet.
    pub progress: Option<TransferProgress>,
    pub style: Style,
}

impl TransferGauge<'_> {
    pub fn label(&self) -> String {
        match self.progress {
            None => "waiting".to_string(),
            Some(TransferProgress {
                loaded,
                total: Some(total),
            }) => format!("{} / {} bytes", loaded, total),
            Some(TransferProgress { loaded, total: None }) => format!("{} bytes", loaded),
        }
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let ratio = self.progress.and_then(|p| p.ratio()).unwrap_or(0.0);
        let gauge = Gauge::default()
            .block(Block::default().title(self.title).borders(Borders::ALL))
            .gauge_style(self.style)
            .ratio(ratio)
            .label(self.label());
        f.render_widget(gauge, area);
    }
}
