//! Reed switch on a sysfs GPIO line.

use super::ContactPin;
use crate::error::DriverError;
use std::fs;
use std::path::{Path, PathBuf};

/// Contact read from a GPIO `value` file (e.g. `/sys/class/gpio/gpio4/value`).
///
/// With the usual pull-up wiring the switch shorts to ground when the magnet
/// moves away, so a LOW level means open (`active_low = true`).
#[derive(Debug, Clone)]
pub struct SysfsContact {
    value_path: PathBuf,
    active_low: bool,
}

impl SysfsContact {
    pub fn new(value_path: impl AsRef<Path>, active_low: bool) -> Self {
        Self {
            value_path: value_path.as_ref().to_path_buf(),
            active_low,
        }
    }
}

impl ContactPin for SysfsContact {
    fn is_open(&mut self) -> Result<bool, DriverError> {
        let raw = fs::read_to_string(&self.value_path)?;
        let high = match raw.trim() {
            "1" => true,
            "0" => false,
            other => return Err(DriverError::InvalidPinValue(other.to_string())),
        };
        Ok(high != self.active_low)
    }
}
