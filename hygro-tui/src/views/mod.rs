//! View rendering dispatch.

pub mod influx;
pub mod raw;
pub mod sensors;

use crate::commands::COMMAND_HELP;
use crate::nav::View;
use crate::state::App;
use crate::widgets::{StatusBar, TransferGauge};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

const FOOTER_HELP: &str = "Tab switch view • j/k move • : command • s save • r reload • d remove • ? help • q quit";

pub fn render_view(f: &mut Frame<'_>, app: &App) {
    let show_gauge = app.running_jobs() > 0 && app.transfer.is_some();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(if show_gauge { 3 } else { 0 }),
            Constraint::Length(3),
        ])
        .split(f.size());

    render_header(f, app, layout[0]);

    match app.active_view {
        View::Sensors => sensors::render(f, app, layout[1]),
        View::Influx => influx::render(f, app, layout[1]),
        View::Raw => raw::render(f, app, layout[1]),
    }

    if show_gauge {
        TransferGauge {
            title: "Transfer",
            progress: app.transfer,
            style: Style::default().fg(app.theme.primary),
        }
        .render(f, layout[2]);
    }

    StatusBar {
        status: app.status(),
        help: FOOTER_HELP,
        input: app.command_palette.as_ref().map(|p| p.input.as_str()),
        theme: &app.theme,
    }
    .render(f, layout[3]);

    if app.help_visible {
        render_help(f, app, f.size());
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let (link, link_color) = if app.device.online {
        ("online", app.theme.success)
    } else {
        ("offline", app.theme.error)
    };
    let mut title = vec![
        Span::styled("HYGRO ", Style::default().fg(app.theme.primary)),
        Span::raw(format!("| {} | ", app.client.base_url())),
        Span::styled(link, Style::default().fg(link_color)),
    ];
    if app.device.dirty {
        title.push(Span::styled(" | unsaved", Style::default().fg(app.theme.warning)));
    }

    let titles: Vec<Line> = View::all()
        .iter()
        .enumerate()
        .map(|(i, view)| Line::from(format!("{} {}", i + 1, view.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(Line::from(title)))
        .select(app.active_view.index())
        .style(Style::default().fg(app.theme.text_dim))
        .highlight_style(
            Style::default()
                .fg(app.theme.secondary)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn render_help(f: &mut Frame<'_>, app: &App, screen: Rect) {
    let area = centered(screen, 60, 20);
    let mut lines = vec![
        Line::from(Span::styled("Commands", Style::default().fg(app.theme.primary))),
    ];
    lines.extend(COMMAND_HELP.iter().map(|(usage, what)| {
        Line::from(vec![
            Span::styled(format!(":{:<20}", usage), Style::default().fg(app.theme.secondary)),
            Span::raw(*what),
        ])
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Esc or ? closes this help",
        Style::default().fg(app.theme.text_dim),
    )));

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().title("Help").borders(Borders::ALL)),
        area,
    );
}

/// Rect of at most `width` x `height` centred in `outer`.
fn centered(outer: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(outer.width);
    let height = height.min(outer.height);
    Rect {
        x: outer.x + (outer.width - width) / 2,
        y: outer.y + (outer.height - height) / 2,
        width,
        height,
    }
}

/// Placeholder shown until the first configuration arrives.
pub(crate) fn render_not_loaded(f: &mut Frame<'_>, app: &App, area: Rect, title: &str) {
    let text = if app.running_jobs() > 0 {
        "Waiting for the device..."
    } else {
        "No configuration loaded. Press r to reload."
    };
    f.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(app.theme.text_dim))
            .block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}
