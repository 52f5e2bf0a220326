//! Edge detector over contact reads.

use super::ContactPin;
use crate::error::DriverError;
use log::{debug, warn};

/// Converts raw contact reads into one event per physical transition.
///
/// The baseline comes from the read taken in [`begin`](Self::begin) and is
/// never reported. The pin is assumed to be electrically debounced, so a
/// single differing read counts as a transition.
pub struct DebouncedMonitor<P> {
    pin: P,
    /// Last recorded state, `true` = open. `None` until `begin` succeeds.
    is_open: Option<bool>,
}

impl<P: ContactPin> DebouncedMonitor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, is_open: None }
    }

    /// Record the baseline state from one read.
    pub fn begin(&mut self) -> Result<bool, DriverError> {
        let is_open = self.pin.is_open()?;
        debug!(
            "[Sensor] Baseline: {}",
            if is_open { "open" } else { "closed" }
        );
        self.is_open = Some(is_open);
        Ok(is_open)
    }

    /// Read once; return the new state only if it differs from the recorded one.
    pub fn poll(&mut self) -> Option<bool> {
        let current = match self.pin.is_open() {
            Ok(v) => v,
            Err(e) => {
                warn!("[Sensor] Read failed: {}", e);
                return None;
            }
        };

        match self.is_open {
            Some(last) if last == current => None,
            Some(_) => {
                self.is_open = Some(current);
                Some(current)
            }
            // A failed begin: take this read as the baseline
            None => {
                self.is_open = Some(current);
                None
            }
        }
    }

    /// Last recorded state without reading the pin.
    pub fn last_state(&self) -> Option<bool> {
        self.is_open
    }
}
