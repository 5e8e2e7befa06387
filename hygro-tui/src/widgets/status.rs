//! Footer status bar.

use crate::notifications::StatusLine;
use crate::theme::{severity_color, SynthBruteTheme};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub struct StatusBar<'a> {
    pub status: &'a StatusLine,
    /// Shown while the status line is hidden.
    pub help: &'a str,
    /// Command palette input, if open.
    pub input: Option<&'a str>,
    pub theme: &'a SynthBruteTheme,
}

impl StatusBar<'_> {
    pub fn line(&self) -> Line<'static> {
        if let Some(input) = self.input {
            return Line::from(vec![
                Span::styled(":", Style::default().fg(self.theme.primary)),
                Span::raw(input.to_string()),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            ]);
        }
        if !self.status.is_visible() {
            return Line::from(Span::styled(
                self.help.to_string(),
                Style::default().fg(self.theme.text_dim),
            ));
        }
        let severity = self.status.severity();
        let color = severity_color(severity, self.theme);
        let text = match severity.label() {
            "" => self.status.text().to_string(),
            label => format!("{}: {}", label, self.status.text()),
        };
        Line::from(Span::styled(text, Style::default().fg(color)))
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let footer = Paragraph::new(self.line()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.border)),
        );
        f.render_widget(footer, area);
    }
}
