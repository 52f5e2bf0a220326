//! Physical door actuator.

pub mod servo;

pub use servo::{PwmServo, ServoCalibration};

use crate::error::DriverError;
use crate::shadow::DoorState;

/// Moves the interior door lock to one of its two positions.
///
/// Repeating a move to the current position must be harmless.
pub trait Actuator {
    fn move_to(&mut self, state: DoorState) -> Result<(), DriverError>;
}
