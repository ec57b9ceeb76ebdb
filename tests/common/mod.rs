#![allow(dead_code)]

use bytes::Bytes;
use pii_transform::avro::AvroCodec;
use pii_transform::event::{convert_events, DEMO_EVENT_SCHEMA};
use pii_transform::registry::InMemoryRegistry;
use pii_transform::transform::TransformRecord;
use std::env;

pub const SCHEMA_ID: u32 = 7;

/// Seeds for tests against a live broker, from `TEST_REDPANDA_SEEDS`.
pub fn test_seeds() -> Vec<String> {
    env::var("TEST_REDPANDA_SEEDS")
        .unwrap_or_else(|_| "localhost:9092".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .collect()
}

pub fn test_registry_url() -> String {
    env::var("TEST_SCHEMA_REGISTRY_URL").unwrap_or_else(|_| "http://localhost:8081".to_string())
}

pub fn registry() -> InMemoryRegistry {
    InMemoryRegistry::new().with_schema(SCHEMA_ID, DEMO_EVENT_SCHEMA)
}

pub fn codec() -> AvroCodec {
    AvroCodec::parse(SCHEMA_ID, DEMO_EVENT_SCHEMA).unwrap()
}

pub fn event_json(message_key: &str, given_name: Option<&str>, last_name: Option<&str>) -> String {
    let mut payload = serde_json::json!({
        "id": "PK000042",
        "name_prefix": "Mr",
        "middle_name": "B",
        "gender": "Male",
        "place_of_birth": "London",
        "country_of_residence": "UK",
        "date_of_birth": 4000
    });
    if let Some(name) = given_name {
        payload["given_name"] = name.into();
        payload["preferred_name"] = name.into();
    }
    if let Some(name) = last_name {
        payload["last_name"] = name.into();
    }

    serde_json::json!([{
        "metadata": {
            "message_key": message_key,
            "created_date": 1296997036167i64,
            "updated_date": 1296997036167i64,
            "outbox_published_date": "2008-02-19T21:24:13Z",
            "event_type": "UPDATE"
        },
        "business_data_payload": payload
    }])
    .to_string()
}

/// A framed record as the loader would publish it.
pub fn framed_record(given_name: Option<&str>, last_name: Option<&str>) -> TransformRecord {
    let json = event_json("key-1", given_name, last_name);
    let (_, datum) = convert_events("demoEvent", json.as_bytes()).unwrap().remove(0);
    TransformRecord::new(
        Some(Bytes::from_static(b"key-1")),
        codec().encode_framed(&datum).unwrap(),
    )
}
