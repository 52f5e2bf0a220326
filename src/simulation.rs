//! Simulated drivers for running endpoints without hardware.

use crate::device::Actuator;
use crate::error::DriverError;
use crate::sensors::ContactPin;
use crate::shadow::DoorState;
use log::info;
use std::time::{Duration, Instant};

/// Servo that only logs and remembers its position.
#[derive(Debug, Default)]
pub struct SimulatedServo {
    position: Option<DoorState>,
    moves: usize,
}

impl SimulatedServo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<DoorState> {
        self.position
    }

    /// Number of move commands received, including repeats.
    pub fn moves(&self) -> usize {
        self.moves
    }
}

impl Actuator for SimulatedServo {
    fn move_to(&mut self, state: DoorState) -> Result<(), DriverError> {
        info!("[Sim] Servo -> {}", state);
        self.position = Some(state);
        self.moves += 1;
        Ok(())
    }
}

/// Contact that flips between closed and open every `period`.
///
/// Useful for exercising the sensor endpoint's report path end to end.
#[derive(Debug)]
pub struct SimulatedContact {
    period: Duration,
    started: Instant,
}

impl SimulatedContact {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            started: Instant::now(),
        }
    }

    fn state_at(&self, elapsed: Duration) -> bool {
        if self.period.is_zero() {
            return false;
        }
        (elapsed.as_millis() / self.period.as_millis().max(1)) % 2 == 1
    }
}

impl ContactPin for SimulatedContact {
    fn is_open(&mut self) -> Result<bool, DriverError> {
        Ok(self.state_at(self.started.elapsed()))
    }
}
