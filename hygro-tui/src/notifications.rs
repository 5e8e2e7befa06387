//! Status line plumbing for the TUI.
//!
//! The footer shows whatever the [`StatusNotifier`] last displayed. Auto-clear
//! timers run as tokio tasks that post [`TuiEvent::AutoClear`] back into the
//! event loop, so the notifier is only ever touched from the loop itself.

use crate::events::TuiEvent;
use hygro_core::{ClearScheduler, ClearTicket, Severity, StatusDisplay, StatusNotifier};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type AppNotifier = StatusNotifier<StatusLine, TokioClearScheduler>;

pub fn app_notifier(sender: mpsc::Sender<TuiEvent>) -> AppNotifier {
    StatusNotifier::new(StatusLine::default(), TokioClearScheduler::new(sender))
}

/// Footer status element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    text: String,
    style_class: String,
    visible: bool,
}

impl StatusLine {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style_class(&self) -> &str {
        &self.style_class
    }

    pub fn severity(&self) -> Severity {
        Severity::from_style_class(&self.style_class)
    }
}

impl StatusDisplay for StatusLine {
    fn display(&mut self, text: &str, style_class: &str) {
        self.text = text.to_string();
        self.style_class = style_class.to_string();
        self.visible = true;
    }

    fn hide(&mut self) {
        self.text.clear();
        self.style_class.clear();
        self.visible = false;
    }
}

/// Auto-clear timers backed by `tokio::time::sleep`. Must be used inside a
/// tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioClearScheduler {
    sender: mpsc::Sender<TuiEvent>,
}

impl TokioClearScheduler {
    pub fn new(sender: mpsc::Sender<TuiEvent>) -> Self {
        Self { sender }
    }
}

impl ClearScheduler for TokioClearScheduler {
    type Handle = JoinHandle<()>;

    fn schedule(&mut self, ticket: ClearTicket, delay: Duration) -> JoinHandle<()> {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(TuiEvent::AutoClear(ticket)).await.is_err() {
                tracing::debug!(ticket = ticket.value(), "event loop closed before auto-clear");
            }
        })
    }

    fn cancel(&mut self, handle: JoinHandle<()>) {
        handle.abort();
    }
}
