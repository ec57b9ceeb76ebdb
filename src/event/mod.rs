//! Business events as they appear in JSON files and on the bus.
//!
//! An [`Event`] is flat metadata plus one person payload. Payload fields are
//! individually optional and become Avro null unions when absent.

pub mod converter;
pub mod generator;

use crate::avro::EventTime;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use converter::{convert_events, ToAvroRecord};
pub use generator::{default_customers, generate_events, Customer};

/// Avro schema of the `demoEvent` kind, as registered with the registry.
pub const DEMO_EVENT_SCHEMA: &str = include_str!("../../schemas/demo_event.avsc");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Insert => "INSERT",
            EventType::Update => "UPDATE",
            EventType::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub message_key: String,
    pub created_date: EventTime,
    pub updated_date: EventTime,
    pub outbox_published_date: EventTime,
    pub event_type: EventType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    /// Days since 1970-01-01.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<i32>,
    /// Days since 1970-01-01.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_residence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub metadata: Metadata,
    #[serde(rename = "business_data_payload")]
    pub payload: Payload,
}

/// Event kinds this crate knows how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Demo,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Demo => "demoEvent",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "demoEvent" => Ok(EventKind::Demo),
            other => Err(Error::UnsupportedEventType(other.to_string())),
        }
    }
}

/// Parses a JSON array of events of the given kind.
pub fn decode_events(kind: &str, json: &[u8]) -> Result<Vec<Event>> {
    match kind.parse::<EventKind>()? {
        EventKind::Demo => serde_json::from_slice(json)
            .map_err(|e| Error::Format(format!("invalid {} JSON: {}", kind, e))),
    }
}

/// Parses a single JSON event of the given kind.
pub fn decode_event(kind: &str, json: &[u8]) -> Result<Event> {
    match kind.parse::<EventKind>()? {
        EventKind::Demo => serde_json::from_slice(json)
            .map_err(|e| Error::Format(format!("invalid {} JSON: {}", kind, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "metadata": {
            "message_key": "tnKGDKUndl",
            "created_date": 1296997036167,
            "updated_date": 693745893153,
            "outbox_published_date": "2008-02-19T21:24:13Z",
            "event_type": "INSERT"
        },
        "business_data_payload": {
            "id": "PKs-Is7j",
            "name_prefix": "Mr",
            "given_name": "Tom",
            "last_name": "Jones",
            "date_of_birth": 4000
        }
    }"#;

    #[test]
    fn test_decode_single_event() {
        let event = decode_event("demoEvent", SAMPLE.as_bytes()).unwrap();
        assert_eq!(event.metadata.message_key, "tnKGDKUndl");
        assert_eq!(event.metadata.event_type, EventType::Insert);
        assert_eq!(event.metadata.created_date.timestamp_millis(), 1296997036167);
        assert_eq!(
            event.metadata.outbox_published_date.timestamp_millis(),
            1203456253000
        );
        assert_eq!(event.payload.last_name.as_deref(), Some("Jones"));
        assert_eq!(event.payload.middle_name, None);
        assert_eq!(event.payload.date_of_birth, Some(4000));
    }

    #[test]
    fn test_decode_array() {
        let json = format!("[{}, {}]", SAMPLE, SAMPLE);
        let events = decode_events("demoEvent", json.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_unknown_kind_is_labeled_error() {
        let err = decode_events("alternative", b"[]").unwrap_err();
        assert!(matches!(err, Error::UnsupportedEventType(ref kind) if kind == "alternative"));
    }

    #[test]
    fn test_unknown_event_type_is_format_error() {
        let json = SAMPLE.replace("\"INSERT\"", "\"UPSERT\"");
        assert!(matches!(
            decode_event("demoEvent", json.as_bytes()),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_bad_timestamp_is_format_error() {
        let json = SAMPLE.replace("1296997036167", "true");
        let err = decode_event("demoEvent", json.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let event = decode_event("demoEvent", SAMPLE.as_bytes()).unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["metadata"]["outbox_published_date"], 1203456253000_i64);
        assert!(json["business_data_payload"].get("middle_name").is_none());
        assert_eq!(json["metadata"]["event_type"], "INSERT");
    }
}
