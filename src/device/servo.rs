//! Hobby servo driven through the Linux sysfs PWM interface.
//!
//! A channel directory such as `/sys/class/pwm/pwmchip0/pwm0` exposes
//! `period`, `duty_cycle` and `enable`, all in nanoseconds. The servo expects
//! a 50 Hz frame with a pulse between the calibrated minimum and maximum
//! widths spanning 0..=180 degrees.

use super::Actuator;
use crate::config::ServoConfig;
use crate::error::DriverError;
use crate::shadow::DoorState;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_ANGLE: u16 = 180;

/// Pulse timing and the two door positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCalibration {
    pub period_hz: u32,
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
    pub open_angle: u16,
    pub closed_angle: u16,
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            period_hz: 50,
            min_pulse_us: 500,
            max_pulse_us: 2500,
            open_angle: 30,
            closed_angle: 120,
        }
    }
}

impl From<&ServoConfig> for ServoCalibration {
    fn from(config: &ServoConfig) -> Self {
        Self {
            period_hz: config.period_hz,
            min_pulse_us: config.min_pulse_us,
            max_pulse_us: config.max_pulse_us,
            open_angle: config.open_angle,
            closed_angle: config.closed_angle,
        }
    }
}

impl ServoCalibration {
    pub fn angle_for(&self, state: DoorState) -> u16 {
        match state {
            DoorState::Open => self.open_angle,
            DoorState::Close => self.closed_angle,
        }
    }

    pub fn period_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.period_hz.max(1))
    }

    /// Pulse width for `angle`, in nanoseconds.
    pub fn duty_ns(&self, angle: u16) -> Result<u64, DriverError> {
        if angle > MAX_ANGLE {
            return Err(DriverError::AngleOutOfRange(angle));
        }
        let span = u64::from(self.max_pulse_us.saturating_sub(self.min_pulse_us));
        let pulse_us = u64::from(self.min_pulse_us) + span * u64::from(angle) / u64::from(MAX_ANGLE);
        Ok(pulse_us * 1000)
    }
}

/// Servo on a sysfs PWM channel.
pub struct PwmServo {
    channel: PathBuf,
    calibration: ServoCalibration,
}

impl PwmServo {
    /// Configure the channel period and enable output.
    pub fn open(channel: impl AsRef<Path>, calibration: ServoCalibration) -> Result<Self, DriverError> {
        let servo = Self {
            channel: channel.as_ref().to_path_buf(),
            calibration,
        };
        servo.write("period", calibration.period_ns())?;
        servo.write("enable", 1)?;
        info!(
            "[Servo] PWM channel {} at {} Hz",
            servo.channel.display(),
            calibration.period_hz
        );
        Ok(servo)
    }

    fn write(&self, attribute: &str, value: u64) -> Result<(), DriverError> {
        fs::write(self.channel.join(attribute), value.to_string())?;
        Ok(())
    }
}

impl Actuator for PwmServo {
    fn move_to(&mut self, state: DoorState) -> Result<(), DriverError> {
        let angle = self.calibration.angle_for(state);
        let duty = self.calibration.duty_ns(angle)?;
        info!("[Servo] {} ({}°)", state, angle);
        self.write("duty_cycle", duty)
    }
}
