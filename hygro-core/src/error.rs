//! Error types for hygro core operations

use crate::device::SensorAddr;
use thiserror::Error;

/// Device configuration validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid field {field}: {len} bytes exceeds the limit of {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Too many sensors: the device holds at most {max}")]
    TooManySensors { max: usize },

    #[error("Sensor {index} has an empty name")]
    EmptySensorName { index: usize },

    #[error("Invalid sensor address: {value}")]
    InvalidAddress { value: String },

    #[error("Sensor address {addr} is configured twice")]
    DuplicateAddress { addr: SensorAddr },

    #[error("Sensor index {index} out of range (have {len})")]
    SensorIndexOutOfRange { index: usize, len: usize },
}

/// Result type alias for hygro core operations.
pub type HygroResult<T> = Result<T, ValidationError>;

// =============================================================================
// TESTS
// =============================================================================
