//! hygro Test Utilities
//!
//! Centralized test infrastructure for the hygro workspace:
//! - Proptest generators for status and device configuration types
//! - Fakes for the status display and the auto-clear timer
//! - An in-process mock of the bridge's HTTP configuration API
//! - Fixtures and custom assertions

pub mod mock_device;

pub use mock_device::MockDevice;

/// Status codes accepted by [`MockDevice::fail_with`].
pub use axum::http::StatusCode;

// Re-export core types for convenience
pub use hygro_core::{
    ClearScheduler, ClearTicket, DeviceConfig, NotifierState, SensorAddr, SensorClient, Severity,
    StatusDisplay, StatusNotifier, ValidationError, AUTO_CLEAR_DELAY, MAX_SENSORS,
};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// FAKE STATUS DISPLAY
// ============================================================================

/// One call made by the notifier on its display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    Show { text: String, style_class: String },
    Hide,
}

/// Display that records every call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    calls: Arc<Mutex<Vec<DisplayCall>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DisplayCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// What the element currently shows: text and style class, or `None` if
    /// hidden.
    pub fn visible(&self) -> Option<(String, String)> {
        match lock(&self.calls).last() {
            Some(DisplayCall::Show { text, style_class }) => {
                Some((text.clone(), style_class.clone()))
            }
            Some(DisplayCall::Hide) | None => None,
        }
    }
}

impl StatusDisplay for RecordingDisplay {
    fn display(&mut self, text: &str, style_class: &str) {
        lock(&self.calls).push(DisplayCall::Show {
            text: text.to_string(),
            style_class: style_class.to_string(),
        });
    }

    fn hide(&mut self) {
        lock(&self.calls).push(DisplayCall::Hide);
    }
}

// ============================================================================
// MANUAL CLOCK
// ============================================================================

#[derive(Debug)]
struct ManualTimer {
    id: u64,
    ticket: ClearTicket,
    deadline: Duration,
}

#[derive(Debug, Default)]
struct ClockState {
    now: Duration,
    next_id: u64,
    timers: Vec<ManualTimer>,
}

/// Virtual-time scheduler. Time only moves when [`ManualClock::advance`] is
/// called. Clones share the same clock.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ClockState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the clock was created.
    pub fn now(&self) -> Duration {
        lock(&self.inner).now
    }

    /// Number of scheduled timers that have neither fired nor been cancelled.
    pub fn outstanding(&self) -> usize {
        lock(&self.inner).timers.len()
    }

    /// Move time forward and return the tickets of timers that came due, in
    /// deadline order.
    pub fn advance(&self, by: Duration) -> Vec<ClearTicket> {
        let mut state = lock(&self.inner);
        state.now += by;
        let now = state.now;
        let mut due: Vec<ManualTimer> = Vec::new();
        let mut remaining = Vec::with_capacity(state.timers.len());
        for timer in state.timers.drain(..) {
            if timer.deadline <= now {
                due.push(timer);
            } else {
                remaining.push(timer);
            }
        }
        state.timers = remaining;
        due.sort_by_key(|t| (t.deadline, t.id));
        due.into_iter().map(|t| t.ticket).collect()
    }

    /// Advance and deliver every fired ticket to `notifier`. Returns how many
    /// deliveries actually cleared the status.
    pub fn drive<D: StatusDisplay>(
        &self,
        notifier: &mut StatusNotifier<D, ManualClock>,
        by: Duration,
    ) -> usize {
        self.advance(by)
            .into_iter()
            .filter(|ticket| notifier.on_auto_clear(*ticket))
            .count()
    }
}

impl ClearScheduler for ManualClock {
    type Handle = u64;

    fn schedule(&mut self, ticket: ClearTicket, delay: Duration) -> u64 {
        let mut state = lock(&self.inner);
        state.next_id += 1;
        let id = state.next_id;
        let deadline = state.now + delay;
        state.timers.push(ManualTimer {
            id,
            ticket,
            deadline,
        });
        id
    }

    fn cancel(&mut self, handle: u64) {
        lock(&self.inner).timers.retain(|t| t.id != handle);
    }
}

/// Notifier wired to a recording display and a manual clock.
pub fn manual_notifier() -> (
    StatusNotifier<RecordingDisplay, ManualClock>,
    RecordingDisplay,
    ManualClock,
) {
    let display = RecordingDisplay::new();
    let clock = ManualClock::new();
    let notifier = StatusNotifier::new(display.clone(), clock.clone());
    (notifier, display, clock)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating hygro types.

    use super::*;
    use proptest::prelude::*;

    /// Generate any severity.
    pub fn arb_severity() -> impl Strategy<Value = Severity> {
        prop::sample::select(Severity::all().to_vec())
    }

    /// Generate status text, empty about one time in five.
    pub fn arb_status_text() -> impl Strategy<Value = String> {
        prop_oneof![
            1 => Just(String::new()),
            4 => "[A-Za-z0-9 .!]{1,24}",
        ]
    }

    /// Generate a sequence of status updates, each with a delay in ms that
    /// elapses before the update is made.
    pub fn arb_status_updates() -> impl Strategy<Value = Vec<(u64, String, Severity)>> {
        prop::collection::vec((0u64..6_000, arb_status_text(), arb_severity()), 1..16)
    }

    /// Generate a valid (non-zero, 48-bit) sensor address.
    pub fn arb_sensor_addr() -> impl Strategy<Value = SensorAddr> {
        (1u64..(1u64 << 48)).prop_filter_map("zero address", SensorAddr::new)
    }

    /// Generate a sensor name within the device limit.
    pub fn arb_sensor_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9 _-]{0,29}"
    }

    fn arb_reading() -> impl Strategy<Value = Option<(f32, f32)>> {
        prop::option::of((-40.0f32..60.0, 0.0f32..100.0))
    }

    /// Generate a sensor, with or without readings.
    pub fn arb_sensor_client() -> impl Strategy<Value = SensorClient> {
        (arb_sensor_name(), arb_sensor_addr(), arb_reading()).prop_map(|(name, addr, reading)| {
            let mut client = SensorClient::new(name, addr);
            if let Some((t, h)) = reading {
                client.t = Some(t);
                client.h = Some(h);
            }
            client
        })
    }

    /// Generate a configuration that passes `DeviceConfig::validate`.
    pub fn arb_valid_device_config() -> impl Strategy<Value = DeviceConfig> {
        (
            "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
            "[a-z]{1,14}",
            prop_oneof![Just(String::new()), "[a-z]{1,8}=[a-z]{1,8}"],
            any::<u16>(),
            prop::collection::btree_set(1u64..(1u64 << 48), 0..=MAX_SENSORS),
            prop::collection::vec(arb_sensor_name(), MAX_SENSORS),
        )
            .prop_map(|(host, db, pfx, interval, addrs, names)| DeviceConfig {
                ifx_host: host,
                ifx_db: db,
                ifx_pfx: pfx,
                ifx_int: interval,
                ifx_clients: addrs
                    .into_iter()
                    .zip(names)
                    .filter_map(|(raw, name)| SensorAddr::new(raw).map(|a| SensorClient::new(name, a)))
                    .collect(),
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    pub fn kitchen_addr() -> SensorAddr {
        SensorAddr::new(0xa4c1_3800_0001).expect("valid sensor address")
    }

    pub fn attic_addr() -> SensorAddr {
        SensorAddr::new(0xa4c1_3800_0002).expect("valid sensor address")
    }

    /// Two sensors; the kitchen one has readings.
    pub fn sample_config() -> DeviceConfig {
        let mut kitchen = SensorClient::new("kitchen", kitchen_addr());
        kitchen.t = Some(21.5);
        kitchen.h = Some(40.0);
        DeviceConfig {
            ifx_host: "192.168.1.10".to_string(),
            ifx_db: "climate".to_string(),
            ifx_pfx: "site=home".to_string(),
            ifx_int: 60,
            ifx_clients: vec![kitchen, SensorClient::new("attic", attic_addr())],
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertions for status display behaviour.

    use super::*;

    /// Assert that the display currently shows `text` with `severity` styling.
    #[track_caller]
    pub fn assert_showing(display: &RecordingDisplay, text: &str, severity: Severity) {
        assert_eq!(
            display.visible(),
            Some((text.to_string(), severity.style_class().to_string())),
            "Expected status {:?} ({:?})",
            text,
            severity
        );
    }

    /// Assert that the display is hidden.
    #[track_caller]
    pub fn assert_hidden(display: &RecordingDisplay) {
        assert!(
            display.visible().is_none(),
            "Expected hidden status, got {:?}",
            display.visible()
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
