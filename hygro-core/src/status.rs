//! Transient status line with a debounced auto-clear.
//!
//! A [`StatusNotifier`] owns the single status message shown to the user and
//! at most one pending auto-clear timer. Every call to
//! [`StatusNotifier::set_status`] replaces the message and restarts the
//! countdown, so rapid updates coalesce and only the latest message survives.
//!
//! The notifier is runtime-agnostic: the UI element is reached through
//! [`StatusDisplay`] and timers through [`ClearScheduler`]. Fired timers are
//! delivered back with [`StatusNotifier::on_auto_clear`] on the thread that
//! owns the notifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How long a non-empty status stays visible without further updates.
pub const AUTO_CLEAR_DELAY: Duration = Duration::from_millis(5000);

// ============================================================================
// SEVERITY
// ============================================================================

/// Display styling category for a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Warn,
    Err,
    Busy,
    #[default]
    None,
}

impl Severity {
    pub fn all() -> &'static [Severity] {
        &[
            Severity::Ok,
            Severity::Warn,
            Severity::Err,
            Severity::Busy,
            Severity::None,
        ]
    }

    /// Style class handed to the display collaborator.
    pub fn style_class(self) -> &'static str {
        match self {
            Severity::Ok => "st-ok",
            Severity::Warn => "st-warn",
            Severity::Err => "st-err",
            Severity::Busy => "st-busy",
            Severity::None => "",
        }
    }

    /// Inverse of [`Severity::style_class`]. Unknown classes get no styling.
    pub fn from_style_class(class: &str) -> Self {
        match class {
            "st-ok" => Severity::Ok,
            "st-warn" => Severity::Warn,
            "st-err" => Severity::Err,
            "st-busy" => Severity::Busy,
            _ => Severity::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warn => "WARN",
            Severity::Err => "ERROR",
            Severity::Busy => "BUSY",
            Severity::None => "",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// COLLABORATORS
// ============================================================================

/// The UI element that renders the status message.
///
/// The notifier calls exactly one of these methods per status update.
pub trait StatusDisplay {
    /// Show `text` styled by `style_class`.
    fn display(&mut self, text: &str, style_class: &str);

    /// Hide the status element entirely.
    fn hide(&mut self);
}

/// Identifies one scheduled auto-clear.
///
/// Tickets increase monotonically per notifier. A fired ticket only clears
/// the status if it is still the pending one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClearTicket(u64);

impl ClearTicket {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Deferred, cancellable delivery of auto-clear tickets.
///
/// `schedule` must not block. After `delay` has elapsed the implementation
/// arranges for the ticket to reach [`StatusNotifier::on_auto_clear`] on the
/// notifier's owning thread. Once `cancel` returns, the handle's ticket is
/// never acted on: the notifier forgets it before cancelling, so a delivery
/// that races the cancellation is ignored.
pub trait ClearScheduler {
    type Handle;

    fn schedule(&mut self, ticket: ClearTicket, delay: Duration) -> Self::Handle;

    fn cancel(&mut self, handle: Self::Handle);
}

// ============================================================================
// NOTIFIER
// ============================================================================

/// Currently displayed status. An empty message means hidden.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotifierState {
    pub message: String,
    pub severity: Severity,
}

impl NotifierState {
    pub fn is_hidden(&self) -> bool {
        self.message.is_empty()
    }
}

struct PendingClear<H> {
    ticket: ClearTicket,
    handle: H,
}

pub struct StatusNotifier<D, S: ClearScheduler> {
    display: D,
    scheduler: S,
    state: NotifierState,
    pending: Option<PendingClear<S::Handle>>,
    next_ticket: u64,
}

impl<D, S> StatusNotifier<D, S>
where
    D: StatusDisplay,
    S: ClearScheduler,
{
    /// Create a notifier in the hidden state with no pending timer.
    pub fn new(display: D, scheduler: S) -> Self {
        Self {
            display,
            scheduler,
            state: NotifierState::default(),
            pending: None,
            next_ticket: 0,
        }
    }

    /// Replace the status message and restart the auto-clear countdown.
    ///
    /// An empty `text` hides the status immediately and leaves no timer
    /// behind.
    pub fn set_status(&mut self, text: impl Into<String>, severity: Severity) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(ticket = pending.ticket.value(), "cancelling status auto-clear");
            self.scheduler.cancel(pending.handle);
        }

        self.state.message = text.into();
        self.state.severity = severity;

        if self.state.is_hidden() {
            self.display.hide();
            return;
        }

        self.display
            .display(&self.state.message, severity.style_class());

        self.next_ticket += 1;
        let ticket = ClearTicket(self.next_ticket);
        let handle = self.scheduler.schedule(ticket, AUTO_CLEAR_DELAY);
        tracing::debug!(ticket = ticket.value(), "scheduled status auto-clear");
        self.pending = Some(PendingClear { ticket, handle });
    }

    pub fn clear_status(&mut self) {
        self.set_status(String::new(), Severity::None);
    }

    pub fn notify_ok(&mut self, text: impl Into<String>) {
        self.set_status(text, Severity::Ok);
    }

    pub fn notify_warn(&mut self, text: impl Into<String>) {
        self.set_status(text, Severity::Warn);
    }

    pub fn notify_err(&mut self, text: impl Into<String>) {
        self.set_status(text, Severity::Err);
    }

    pub fn notify_busy(&mut self, text: impl Into<String>) {
        self.set_status(text, Severity::Busy);
    }

    /// Deliver a fired auto-clear timer.
    ///
    /// Returns `true` if the ticket was the pending one and the status was
    /// cleared. Stale tickets are ignored.
    pub fn on_auto_clear(&mut self, ticket: ClearTicket) -> bool {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                // The timer has fired; there is nothing left to cancel.
                self.pending = None;
                self.state = NotifierState::default();
                self.display.hide();
                true
            }
            _ => {
                tracing::debug!(ticket = ticket.value(), "ignoring stale status auto-clear");
                false
            }
        }
    }

    pub fn state(&self) -> &NotifierState {
        &self.state
    }

    pub fn message(&self) -> &str {
        &self.state.message
    }

    pub fn severity(&self) -> Severity {
        self.state.severity
    }

    /// Ticket of the outstanding auto-clear, if any.
    pub fn pending_clear(&self) -> Option<ClearTicket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<D, S> fmt::Debug for StatusNotifier<D, S>
where
    D: StatusDisplay + fmt::Debug,
    S: ClearScheduler + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusNotifier")
            .field("display", &self.display)
            .field("scheduler", &self.scheduler)
            .field("state", &self.state)
            .field("pending_clear", &self.pending_clear())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
