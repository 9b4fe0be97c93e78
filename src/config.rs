//! Configuration loading and validation.
//!
//! Settings can come from a JSON file and be overridden on the command
//! line. Every field is optional:
//!
//! ```json
//! {
//!   "keys": "a,b:500000,enter",
//!   "wait_for_signal": true,
//!   "create_settle": "1s",
//!   "destroy_settle": "500ms",
//!   "device_name": "Emit key",
//!   "vendor_id": 4660,
//!   "product_id": 22136
//! }
//! ```

use crate::device::{DeviceIdentity, DEFAULT_DEVICE_NAME, DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID};
use crate::error::{EmitKeyError, Result};
use crate::sequence::PressSequence;
use crate::sequencer::{EmissionMode, Timing, DEFAULT_SETTLE};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Longest name uinput accepts (`UINPUT_MAX_NAME_SIZE` minus the NUL).
pub const MAX_DEVICE_NAME_LEN: usize = 79;

/// Upper bound for either settle delay.
pub const MAX_SETTLE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_keys")]
    pub keys: String,

    #[serde(default)]
    pub wait_for_signal: bool,

    #[serde(default = "default_settle", deserialize_with = "deserialize_duration")]
    pub create_settle: Duration,

    #[serde(default = "default_settle", deserialize_with = "deserialize_duration")]
    pub destroy_settle: Duration,

    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "default_product_id")]
    pub product_id: u16,

    #[serde(default)]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keys: default_keys(),
            wait_for_signal: false,
            create_settle: DEFAULT_SETTLE,
            destroy_settle: DEFAULT_SETTLE,
            device_name: default_device_name(),
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            verbose: false,
        }
    }
}

fn default_keys() -> String {
    "F12".to_string()
}

fn default_settle() -> Duration {
    DEFAULT_SETTLE
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}

fn default_vendor_id() -> u16 {
    DEFAULT_VENDOR_ID
}

fn default_product_id() -> u16 {
    DEFAULT_PRODUCT_ID
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EmitKeyError::config_load(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&content)
            .map_err(|e| EmitKeyError::config_load(path.display().to_string(), e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.keys.trim().is_empty() {
            return Err(EmitKeyError::config_validation("keys cannot be empty"));
        }

        if self.device_name.is_empty() {
            return Err(EmitKeyError::config_validation(
                "device_name cannot be empty",
            ));
        }

        if self.device_name.len() > MAX_DEVICE_NAME_LEN {
            return Err(EmitKeyError::config_validation(format!(
                "device_name is longer than {MAX_DEVICE_NAME_LEN} bytes"
            )));
        }

        for (field, value) in [
            ("create_settle", self.create_settle),
            ("destroy_settle", self.destroy_settle),
        ] {
            if value > MAX_SETTLE {
                return Err(EmitKeyError::config_validation(format!(
                    "{field} must not exceed {}s",
                    MAX_SETTLE.as_secs()
                )));
            }
        }

        Ok(())
    }

    pub fn sequence(&self) -> Result<PressSequence> {
        PressSequence::parse(&self.keys)
    }

    pub fn mode(&self) -> EmissionMode {
        if self.wait_for_signal {
            EmissionMode::WaitForTrigger
        } else {
            EmissionMode::Immediate
        }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            create_settle: self.create_settle,
            destroy_settle: self.destroy_settle,
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            name: self.device_name.clone(),
            vendor_id: self.vendor_id,
            product_id: self.product_id,
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

/// Parse a human duration such as `500ms`, `1s` or `2m`. A bare number is
/// taken as milliseconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err(EmitKeyError::invalid_duration(s, "empty duration"));
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    if number.is_empty() {
        return Err(EmitKeyError::invalid_duration(
            s.clone(),
            "expected a non-negative number",
        ));
    }

    let value: u64 = number
        .parse()
        .map_err(|_| EmitKeyError::invalid_duration(s.clone(), "number out of range"))?;

    match unit.trim() {
        "" | "ms" => Ok(Duration::from_millis(value)),
        "us" => Ok(Duration::from_micros(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| EmitKeyError::invalid_duration(s.clone(), "number out of range")),
        other => Err(EmitKeyError::invalid_duration(
            s.clone(),
            format!("unknown unit '{other}' (use us, ms, s or m)"),
        )),
    }
}
