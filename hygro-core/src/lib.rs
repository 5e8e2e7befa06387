//! hygro Core - status notifier and device configuration model
//!
//! Runtime-agnostic building blocks shared by the terminal client and the
//! test utilities. Nothing in this crate performs I/O.

pub mod device;
pub mod error;
pub mod influx;
pub mod status;

pub use device::{
    DeviceConfig, SensorAddr, SensorClient, CONFIG_PATH, DATABASE_MAX, HOST_MAX, MAX_SENSORS,
    PREFIX_MAX, SENSOR_NAME_MAX,
};
pub use error::{HygroResult, ValidationError};
pub use status::{
    ClearScheduler, ClearTicket, NotifierState, Severity, StatusDisplay, StatusNotifier,
    AUTO_CLEAR_DELAY,
};
