//! Event types for the TUI event loop.

use crate::jobs::JobEvent;
use crossterm::event::KeyEvent;
use hygro_core::ClearTicket;

#[derive(Debug)]
pub enum TuiEvent {
    Input(KeyEvent),
    Tick,
    Resize { width: u16, height: u16 },
    /// A status auto-clear timer fired.
    AutoClear(ClearTicket),
    Job(JobEvent),
}
