//! Reusable widget components.

pub mod detail;
pub mod progress;
pub mod status;

pub use detail::DetailPanel;
pub use progress::TransferGauge;
pub use status::StatusBar;
