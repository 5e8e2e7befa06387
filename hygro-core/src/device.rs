//! Device configuration model.
//!
//! Mirrors the JSON document served and accepted by the bridge at
//! `/api/conf.json`. Field limits follow the device's fixed-size buffers: a
//! string field must be shorter than its buffer minus one byte.

use crate::error::{HygroResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Path of the configuration document on the device.
pub const CONFIG_PATH: &str = "/api/conf.json";

/// Maximum number of sensors the device tracks.
pub const MAX_SENSORS: usize = 8;
pub const SENSOR_NAME_MAX: usize = 30;
pub const HOST_MAX: usize = 30;
pub const DATABASE_MAX: usize = 14;
pub const PREFIX_MAX: usize = 30;

const ADDR_BITS: u32 = 48;

// ============================================================================
// SENSOR ADDRESS
// ============================================================================

/// 48-bit BLE device address. Zero marks an empty slot on the device and is
/// never a valid sensor address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SensorAddr(u64);

impl SensorAddr {
    pub fn new(raw: u64) -> Option<Self> {
        if raw == 0 || raw >> ADDR_BITS != 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Address bytes, most significant first.
    pub fn octets(self) -> [u8; 6] {
        let b = self.0.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }
}

impl fmt::Display for SensorAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}

impl FromStr for SensorAddr {
    type Err = ValidationError;

    /// Accepts `a4c138000001`, `0xa4c138000001` or `a4:c1:38:00:00:01`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidAddress {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let hex: String = if digits.contains(':') {
            let parts: Vec<&str> = digits.split(':').collect();
            if parts.len() != 6 || parts.iter().any(|p| p.is_empty() || p.len() > 2) {
                return Err(invalid());
            }
            parts.iter().map(|p| format!("{:0>2}", p)).collect()
        } else {
            digits.to_string()
        };

        if hex.is_empty() || hex.len() > 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let raw = u64::from_str_radix(&hex, 16).map_err(|_| invalid())?;
        SensorAddr::new(raw).ok_or_else(invalid)
    }
}

impl TryFrom<String> for SensorAddr {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SensorAddr> for String {
    fn from(addr: SensorAddr) -> Self {
        addr.to_string()
    }
}

// ============================================================================
// CONFIG DOCUMENT
// ============================================================================

/// A configured sensor and its latest readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorClient {
    pub name: String,
    pub addr: SensorAddr,
    /// Temperature in °C; `None` until the device has heard from the sensor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<f32>,
    /// Relative humidity in %.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f32>,
}

impl SensorClient {
    pub fn new(name: impl Into<String>, addr: SensorAddr) -> Self {
        Self {
            name: name.into(),
            addr,
            t: None,
            h: None,
        }
    }

    /// Both readings, if the device has reported them.
    pub fn reading(&self) -> Option<(f32, f32)> {
        match (self.t, self.h) {
            (Some(t), Some(h)) => Some((t, h)),
            _ => None,
        }
    }
}

/// InfluxDB forwarding settings and the sensor list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// InfluxDB host, dotted IPv4 on the device side.
    pub ifx_host: String,
    /// Measurement name.
    pub ifx_db: String,
    /// Extra tags appended to every line.
    pub ifx_pfx: String,
    /// Reporting interval in seconds.
    pub ifx_int: u16,
    #[serde(default)]
    pub ifx_clients: Vec<SensorClient>,
}

impl DeviceConfig {
    pub fn validate(&self) -> HygroResult<()> {
        check_len("ifx_host", &self.ifx_host, HOST_MAX)?;
        check_len("ifx_db", &self.ifx_db, DATABASE_MAX)?;
        check_len("ifx_pfx", &self.ifx_pfx, PREFIX_MAX)?;

        if self.ifx_clients.len() > MAX_SENSORS {
            return Err(ValidationError::TooManySensors { max: MAX_SENSORS });
        }

        let mut seen = HashSet::new();
        for (index, client) in self.ifx_clients.iter().enumerate() {
            check_name(index, &client.name)?;
            if !seen.insert(client.addr) {
                return Err(ValidationError::DuplicateAddress { addr: client.addr });
            }
        }
        Ok(())
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> HygroResult<()> {
        let host = host.into();
        check_len("ifx_host", &host, HOST_MAX)?;
        self.ifx_host = host;
        Ok(())
    }

    pub fn set_database(&mut self, db: impl Into<String>) -> HygroResult<()> {
        let db = db.into();
        check_len("ifx_db", &db, DATABASE_MAX)?;
        self.ifx_db = db;
        Ok(())
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) -> HygroResult<()> {
        let prefix = prefix.into();
        check_len("ifx_pfx", &prefix, PREFIX_MAX)?;
        self.ifx_pfx = prefix;
        Ok(())
    }

    pub fn set_interval(&mut self, seconds: u16) {
        self.ifx_int = seconds;
    }

    /// Append a sensor and return its index.
    pub fn add_sensor(&mut self, addr: SensorAddr, name: impl Into<String>) -> HygroResult<usize> {
        let name = name.into();
        if self.ifx_clients.len() >= MAX_SENSORS {
            return Err(ValidationError::TooManySensors { max: MAX_SENSORS });
        }
        let index = self.ifx_clients.len();
        check_name(index, &name)?;
        if self.ifx_clients.iter().any(|c| c.addr == addr) {
            return Err(ValidationError::DuplicateAddress { addr });
        }
        self.ifx_clients.push(SensorClient::new(name, addr));
        Ok(index)
    }

    pub fn remove_sensor(&mut self, index: usize) -> HygroResult<SensorClient> {
        self.check_index(index)?;
        Ok(self.ifx_clients.remove(index))
    }

    pub fn rename_sensor(&mut self, index: usize, name: impl Into<String>) -> HygroResult<()> {
        self.check_index(index)?;
        let name = name.into();
        check_name(index, &name)?;
        self.ifx_clients[index].name = name;
        Ok(())
    }

    pub fn sensor(&self, index: usize) -> Option<&SensorClient> {
        self.ifx_clients.get(index)
    }

    /// Forget all readings. The device does the same when a config is stored.
    pub fn clear_readings(&mut self) {
        for client in &mut self.ifx_clients {
            client.t = None;
            client.h = None;
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    fn check_index(&self, index: usize) -> HygroResult<()> {
        if index >= self.ifx_clients.len() {
            return Err(ValidationError::SensorIndexOutOfRange {
                index,
                len: self.ifx_clients.len(),
            });
        }
        Ok(())
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> HygroResult<()> {
    if value.len() > max {
        return Err(ValidationError::FieldTooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

fn check_name(index: usize, name: &str) -> HygroResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptySensorName { index });
    }
    check_len("name", name, SENSOR_NAME_MAX)
}

// =============================================================================
// TESTS
// =============================================================================
