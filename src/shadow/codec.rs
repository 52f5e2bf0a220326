//! JSON encoding and decoding of shadow documents.

use super::{DoorState, ReportedState, ShadowUpdate, UpdateSource};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::str::FromStr;
use thiserror::Error;

/// Largest inbound delta/desired document accepted by the decoder, in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 512;

/// Largest full shadow document (with metadata) accepted for status reads.
pub const MAX_SHADOW_DOCUMENT_SIZE: usize = 8 * 1024;

/// Reasons a payload could not be decoded at all.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("malformed shadow document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Outcome of looking up the tracked attribute in a well-formed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A recognized request.
    Update(ShadowUpdate),
    /// Neither the delta nor the desired location carries the attribute.
    Missing,
    /// The attribute is present but its value is neither `OPEN` nor `CLOSE`.
    Unrecognized { source: UpdateSource, value: String },
}

/// Decode an inbound delta or desired document for `attribute`.
///
/// The delta shape (`state.<attribute>`) wins over the desired shape
/// (`state.desired.<attribute>`). Only string values count as present.
pub fn decode_update(attribute: &str, payload: &[u8]) -> Result<Resolution, DecodeError> {
    let doc: Value = parse(payload, MAX_PAYLOAD_SIZE)?;

    let Some(state) = doc.get("state") else {
        return Ok(Resolution::Missing);
    };

    let found = match state.get(attribute).and_then(Value::as_str) {
        Some(value) => Some((UpdateSource::Delta, value)),
        None => state
            .get("desired")
            .and_then(|desired| desired.get(attribute))
            .and_then(Value::as_str)
            .map(|value| (UpdateSource::Desired, value)),
    };

    let Some((source, value)) = found else {
        return Ok(Resolution::Missing);
    };

    Ok(match DoorState::from_str(value) {
        Ok(requested) => Resolution::Update(ShadowUpdate {
            attribute: attribute.to_string(),
            requested,
            source,
        }),
        Err(_) => Resolution::Unrecognized {
            source,
            value: value.to_string(),
        },
    })
}

/// Encode `{"state":{"reported":{<attribute>: <value>}}}`.
pub fn encode_reported(report: &ReportedState) -> String {
    section_document("reported", &report.attribute, report.value)
}

/// Encode `{"state":{"desired":{<attribute>: <value>}}}`.
pub fn encode_desired(attribute: &str, value: DoorState) -> String {
    section_document("desired", attribute, value)
}

fn section_document(section: &str, attribute: &str, value: DoorState) -> String {
    let mut fields = Map::new();
    fields.insert(attribute.to_string(), Value::String(value.to_string()));

    let mut state = Map::new();
    state.insert(section.to_string(), Value::Object(fields));

    json!({ "state": Value::Object(state) }).to_string()
}

/// One attribute as seen in a full shadow document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowStatus {
    pub desired: Option<String>,
    pub reported: Option<String>,
}

impl ShadowStatus {
    /// The reported value when present, otherwise the desired one.
    pub fn effective(&self) -> Option<&str> {
        self.reported.as_deref().or(self.desired.as_deref())
    }

    /// The effective value as a door state. `CLOSED` is read as `CLOSE`.
    pub fn door_state(&self) -> Option<DoorState> {
        match self.effective()? {
            "OPEN" => Some(DoorState::Open),
            "CLOSE" | "CLOSED" => Some(DoorState::Close),
            _ => None,
        }
    }
}

/// Full shadow document as returned by `get/accepted`. Metadata, version
/// and timestamps are ignored.
#[derive(Debug, Default, Deserialize)]
struct ShadowDocument {
    #[serde(default)]
    state: ShadowSections,
}

#[derive(Debug, Default, Deserialize)]
struct ShadowSections {
    #[serde(default)]
    desired: Map<String, Value>,
    #[serde(default)]
    reported: Map<String, Value>,
}

/// Decode a full shadow document (a `get/accepted` response) for `attribute`.
pub fn decode_status(attribute: &str, payload: &[u8]) -> Result<ShadowStatus, DecodeError> {
    let doc: ShadowDocument = parse(payload, MAX_SHADOW_DOCUMENT_SIZE)?;
    let field = |section: &Map<String, Value>| {
        section
            .get(attribute)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    Ok(ShadowStatus {
        desired: field(&doc.state.desired),
        reported: field(&doc.state.reported),
    })
}

fn parse<T: DeserializeOwned>(payload: &[u8], max: usize) -> Result<T, DecodeError> {
    if payload.len() > max {
        return Err(DecodeError::TooLarge {
            size: payload.len(),
            max,
        });
    }
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::{EXTERIOR_DOOR, INTERIOR_DOOR};

    fn update(requested: DoorState, source: UpdateSource) -> Resolution {
        Resolution::Update(ShadowUpdate {
            attribute: INTERIOR_DOOR.to_string(),
            requested,
            source,
        })
    }

    #[test]
    fn test_decode_delta() {
        let result = decode_update(INTERIOR_DOOR, br#"{"state":{"interiorDoor":"OPEN"}}"#).unwrap();
        assert_eq!(result, update(DoorState::Open, UpdateSource::Delta));
    }

    #[test]
    fn test_decode_desired() {
        let payload = br#"{"state":{"desired":{"interiorDoor":"CLOSE"}}}"#;
        let result = decode_update(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(result, update(DoorState::Close, UpdateSource::Desired));
    }

    #[test]
    fn test_delta_takes_precedence() {
        let payload = br#"{"state":{"interiorDoor":"CLOSE","desired":{"interiorDoor":"OPEN"}}}"#;
        let result = decode_update(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(result, update(DoorState::Close, UpdateSource::Delta));
    }

    #[test]
    fn test_aws_delta_envelope() {
        let payload = br#"{"version":42,"timestamp":1700000000,
            "state":{"interiorDoor":"OPEN"},
            "metadata":{"interiorDoor":{"timestamp":1700000000}}}"#;
        let result = decode_update(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(result, update(DoorState::Open, UpdateSource::Delta));
    }

    #[test]
    fn test_missing_attribute() {
        let result = decode_update(INTERIOR_DOOR, br#"{"state":{"somethingElse":"X"}}"#).unwrap();
        assert_eq!(result, Resolution::Missing);

        let result = decode_update(INTERIOR_DOOR, br#"{"version":3}"#).unwrap();
        assert_eq!(result, Resolution::Missing);

        // A reported-only document is not a request
        let payload = br#"{"state":{"reported":{"interiorDoor":"OPEN"}}}"#;
        let result = decode_update(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(result, Resolution::Missing);
    }

    #[test]
    fn test_non_string_value_is_absent() {
        let payload = br#"{"state":{"interiorDoor":1,"desired":{"interiorDoor":"OPEN"}}}"#;
        let result = decode_update(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(result, update(DoorState::Open, UpdateSource::Desired));
    }

    #[test]
    fn test_unrecognized_value() {
        let result = decode_update(INTERIOR_DOOR, br#"{"state":{"interiorDoor":"AJAR"}}"#).unwrap();
        assert_eq!(
            result,
            Resolution::Unrecognized {
                source: UpdateSource::Delta,
                value: "AJAR".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_payload() {
        let result = decode_update(INTERIOR_DOOR, br#"{"state":{"interiorDoor":"OP"#);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));

        let result = decode_update(INTERIOR_DOOR, b"\xff\xfe");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_oversized_payload() {
        let padding = "x".repeat(MAX_PAYLOAD_SIZE);
        let payload = format!(r#"{{"state":{{"interiorDoor":"OPEN"}},"pad":"{}"}}"#, padding);
        match decode_update(INTERIOR_DOOR, payload.as_bytes()) {
            Err(DecodeError::TooLarge { size, max }) => {
                assert_eq!(size, payload.len());
                assert_eq!(max, MAX_PAYLOAD_SIZE);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_reported() {
        let report = ReportedState::new(INTERIOR_DOOR, DoorState::Open);
        assert_eq!(
            encode_reported(&report),
            r#"{"state":{"reported":{"interiorDoor":"OPEN"}}}"#
        );

        let report = ReportedState::new(EXTERIOR_DOOR, DoorState::Close);
        assert_eq!(
            encode_reported(&report),
            r#"{"state":{"reported":{"exteriorDoor":"CLOSE"}}}"#
        );
    }

    #[test]
    fn test_encode_desired() {
        assert_eq!(
            encode_desired(INTERIOR_DOOR, DoorState::Close),
            r#"{"state":{"desired":{"interiorDoor":"CLOSE"}}}"#
        );
    }

    #[test]
    fn test_status_prefers_reported() {
        let payload = br#"{"state":{"desired":{"interiorDoor":"OPEN"},
            "reported":{"interiorDoor":"CLOSE","exteriorDoor":"OPEN"}}}"#;
        let status = decode_status(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(status.desired.as_deref(), Some("OPEN"));
        assert_eq!(status.reported.as_deref(), Some("CLOSE"));
        assert_eq!(status.door_state(), Some(DoorState::Close));

        let status = decode_status(EXTERIOR_DOOR, payload).unwrap();
        assert_eq!(status.door_state(), Some(DoorState::Open));
    }

    #[test]
    fn test_status_falls_back_to_desired() {
        let payload = br#"{"state":{"desired":{"interiorDoor":"CLOSED"}}}"#;
        let status = decode_status(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(status.effective(), Some("CLOSED"));
        assert_eq!(status.door_state(), Some(DoorState::Close));
    }

    #[test]
    fn test_status_accepts_large_documents() {
        let metadata = "m".repeat(MAX_PAYLOAD_SIZE);
        let payload = format!(
            r#"{{"state":{{"reported":{{"interiorDoor":"OPEN"}}}},"metadata":"{}"}}"#,
            metadata
        );
        let status = decode_status(INTERIOR_DOOR, payload.as_bytes()).unwrap();
        assert_eq!(status.door_state(), Some(DoorState::Open));
    }

    #[test]
    fn test_status_ignores_envelope_fields() {
        let payload = br#"{"state":{"desired":{"interiorDoor":"OPEN","extra":1},
            "reported":{"interiorDoor":5}},
            "metadata":{"desired":{"interiorDoor":{"timestamp":1700000000}}},
            "version":7,"timestamp":1700000001}"#;
        let status = decode_status(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(status.desired.as_deref(), Some("OPEN"));
        assert_eq!(status.reported, None);

        let status = decode_status(INTERIOR_DOOR, br#"{"version":1}"#).unwrap();
        assert_eq!(status, ShadowStatus::default());
        assert!(matches!(
            decode_status(INTERIOR_DOOR, br#"{"state":"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_status_unknown() {
        let status = decode_status(INTERIOR_DOOR, br#"{"state":{}}"#).unwrap();
        assert_eq!(status, ShadowStatus::default());
        assert_eq!(status.door_state(), None);

        let payload = br#"{"state":{"reported":{"interiorDoor":"JAMMED"}}}"#;
        let status = decode_status(INTERIOR_DOOR, payload).unwrap();
        assert_eq!(status.effective(), Some("JAMMED"));
        assert_eq!(status.door_state(), None);
    }
}
