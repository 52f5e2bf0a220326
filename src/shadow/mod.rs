//! Device shadow message model.
//!
//! The shadow service keeps a `desired` and a `reported` section per device
//! and computes a `delta` when they differ. Both door endpoints synchronize a
//! single string attribute (`interiorDoor` or `exteriorDoor`) through it.

mod codec;

pub use codec::{
    DecodeError, MAX_PAYLOAD_SIZE, MAX_SHADOW_DOCUMENT_SIZE, Resolution, ShadowStatus,
    decode_status, decode_update, encode_desired, encode_reported,
};

use strum::{AsRefStr, Display, EnumString};

/// Attribute driven by the actuator endpoint.
pub const INTERIOR_DOOR: &str = "interiorDoor";

/// Attribute reported by the sensor endpoint.
pub const EXTERIOR_DOOR: &str = "exteriorDoor";

/// The two values a door attribute can take on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum DoorState {
    #[strum(serialize = "OPEN")]
    Open,
    #[strum(serialize = "CLOSE")]
    Close,
}

impl DoorState {
    /// Map a contact reading (`true` = open) to its wire value.
    pub fn from_open(is_open: bool) -> Self {
        if is_open {
            DoorState::Open
        } else {
            DoorState::Close
        }
    }

    pub fn is_open(self) -> bool {
        self == DoorState::Open
    }
}

/// Which shadow section supplied a requested value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UpdateSource {
    #[strum(serialize = "delta")]
    Delta,
    #[strum(serialize = "desired")]
    Desired,
}

/// A recognized request for the tracked attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowUpdate {
    pub attribute: String,
    pub requested: DoorState,
    pub source: UpdateSource,
}

/// Outbound `reported` confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedState {
    pub attribute: String,
    pub value: DoorState,
}

impl ReportedState {
    pub fn new(attribute: impl Into<String>, value: DoorState) -> Self {
        Self {
            attribute: attribute.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_door_state_wire_strings() {
        assert_eq!(DoorState::Open.to_string(), "OPEN");
        assert_eq!(DoorState::Close.as_ref(), "CLOSE");
        assert_eq!(DoorState::from_str("OPEN").unwrap(), DoorState::Open);
        assert_eq!(DoorState::from_str("CLOSE").unwrap(), DoorState::Close);
        assert!(DoorState::from_str("open").is_err());
        assert!(DoorState::from_str("CLOSED").is_err());
    }

    #[test]
    fn test_from_open() {
        assert_eq!(DoorState::from_open(true), DoorState::Open);
        assert_eq!(DoorState::from_open(false), DoorState::Close);
        assert!(DoorState::Open.is_open());
        assert!(!DoorState::Close.is_open());
    }
}
