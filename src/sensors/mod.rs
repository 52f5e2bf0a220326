//! Door contact sensing.
//!
//! A magnetic reed switch is read through a [`ContactPin`]; the
//! [`DebouncedMonitor`] turns successive reads into transition events.

pub mod contact;
pub mod monitor;

pub use contact::SysfsContact;
pub use monitor::DebouncedMonitor;

use crate::error::DriverError;

/// Source of instantaneous door readings.
pub trait ContactPin {
    /// Read the pin once. `true` means the door is open.
    fn is_open(&mut self) -> Result<bool, DriverError>;
}
