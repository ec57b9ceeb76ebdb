//! Maps decoded events onto the record tree of the destination Avro schema.

use super::{decode_events, Event, Metadata, Payload};
use crate::avro::union::STRING_TAG;
use crate::avro::{to_avro_date, to_avro_timestamp, Datum, NestedMap, UnionValue};
use crate::Result;
use tracing::debug;

/// Conversion of a known event kind into an Avro record tree.
pub trait ToAvroRecord {
    fn to_avro_record(&self) -> Result<NestedMap>;
}

impl ToAvroRecord for Event {
    fn to_avro_record(&self) -> Result<NestedMap> {
        let mut record = NestedMap::new();
        record.insert("metadata".into(), Datum::Record(convert_metadata(&self.metadata)));
        record.insert("payload".into(), Datum::Record(convert_payload(&self.payload)?));

        debug!(message_key = %self.metadata.message_key, "Converted event to avro record");
        Ok(record)
    }
}

fn convert_metadata(metadata: &Metadata) -> NestedMap {
    let mut record = NestedMap::new();
    record.insert("message_key".into(), Datum::from(metadata.message_key.as_str()));
    record.insert(
        "created_date".into(),
        Datum::TimestampMillis(to_avro_timestamp(&metadata.created_date.0)),
    );
    record.insert(
        "updated_date".into(),
        Datum::TimestampMillis(to_avro_timestamp(&metadata.updated_date.0)),
    );
    record.insert(
        "outbox_published_date".into(),
        Datum::TimestampMillis(to_avro_timestamp(&metadata.outbox_published_date.0)),
    );
    record.insert("event_type".into(), Datum::from(metadata.event_type.as_str()));
    record
}

fn convert_payload(payload: &Payload) -> Result<NestedMap> {
    let optional_strings = [
        ("name_prefix", &payload.name_prefix),
        ("preferred_name", &payload.preferred_name),
        ("given_name", &payload.given_name),
        ("last_name", &payload.last_name),
        ("middle_name", &payload.middle_name),
        ("gender", &payload.gender),
        ("place_of_birth", &payload.place_of_birth),
        ("country_of_residence", &payload.country_of_residence),
    ];

    let mut record = NestedMap::new();
    record.insert("id".into(), Datum::from(payload.id.as_str()));
    for (name, value) in optional_strings {
        record.insert(
            name.into(),
            UnionValue::wrap(value.as_deref(), STRING_TAG).into(),
        );
    }
    record.insert("date_of_birth".into(), date_union(payload.date_of_birth).into());
    record.insert("date_of_death".into(), date_union(payload.date_of_death).into());
    Ok(record)
}

fn date_union(days: Option<i32>) -> UnionValue {
    days.map_or(UnionValue::Null, to_avro_date)
}

/// Decodes a JSON array of `kind` events and converts each one.
pub fn convert_events(kind: &str, json: &[u8]) -> Result<Vec<(Event, NestedMap)>> {
    decode_events(kind, json)?
        .into_iter()
        .map(|event| {
            let record = event.to_avro_record()?;
            Ok((event, record))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::{decode_datum, encode_datum, EventTime};
    use crate::event::{EventType, DEMO_EVENT_SCHEMA};
    use crate::Error;
    use apache_avro::Schema;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn event() -> Event {
        Event {
            metadata: Metadata {
                message_key: "tnKGDKUndl".into(),
                created_date: EventTime(Utc.timestamp_millis_opt(1296997036167).unwrap()),
                updated_date: EventTime(Utc.timestamp_millis_opt(693745893153).unwrap()),
                outbox_published_date: EventTime(Utc.timestamp_millis_opt(1203458653655).unwrap()),
                event_type: EventType::Update,
            },
            payload: Payload {
                id: "PKs-Is7j".into(),
                given_name: Some("Tom".into()),
                last_name: Some("Jones".into()),
                date_of_birth: Some(4000),
                ..Default::default()
            },
        }
    }

    fn payload_of(record: &NestedMap) -> &NestedMap {
        record["payload"].as_record().unwrap()
    }

    #[test]
    fn test_metadata_fields() {
        let record = event().to_avro_record().unwrap();
        let metadata = record["metadata"].as_record().unwrap();

        assert_eq!(metadata["message_key"], Datum::from("tnKGDKUndl"));
        assert_eq!(metadata["created_date"], Datum::TimestampMillis(1296997036167));
        assert_eq!(metadata["event_type"], Datum::from("UPDATE"));
    }

    #[test]
    fn test_optional_fields_are_unions() {
        let record = event().to_avro_record().unwrap();
        let payload = payload_of(&record);

        assert_eq!(payload["id"], Datum::from("PKs-Is7j"));
        assert_eq!(payload["given_name"], Datum::Union(UnionValue::string("Tom")));
        assert_eq!(payload["middle_name"], Datum::Union(UnionValue::Null));
        assert_eq!(payload["date_of_death"], Datum::Union(UnionValue::Null));
        assert_eq!(
            payload["date_of_birth"],
            Datum::Union(UnionValue::wrap(
                NaiveDate::from_ymd_opt(1980, 12, 14),
                "int.date"
            ))
        );
    }

    #[test]
    fn test_converted_record_matches_schema() {
        let schema = Schema::parse_str(DEMO_EVENT_SCHEMA).unwrap();
        let record = event().to_avro_record().unwrap();

        let bytes = encode_datum(&record, &schema).unwrap();
        assert_eq!(decode_datum(&bytes, &schema).unwrap(), record);
    }

    #[test]
    fn test_extreme_dates_round_trip() {
        let schema = Schema::parse_str(DEMO_EVENT_SCHEMA).unwrap();
        for days in [i32::MAX, i32::MIN] {
            let mut event = event();
            event.payload.date_of_birth = Some(days);
            let record = event.to_avro_record().unwrap();
            assert_eq!(
                payload_of(&record)["date_of_birth"],
                Datum::Union(to_avro_date(days))
            );

            let bytes = encode_datum(&record, &schema).unwrap();
            let decoded = decode_datum(&bytes, &schema).unwrap();
            assert_eq!(decoded, record);
            assert_eq!(encode_datum(&decoded, &schema).unwrap(), bytes);
        }
    }

    #[test]
    fn test_convert_events_dispatch() {
        let json = serde_json::to_vec(&vec![event(), event()]).unwrap();
        let converted = convert_events("demoEvent", &json).unwrap();
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].0.metadata.message_key, "tnKGDKUndl");

        assert!(matches!(
            convert_events("somethingElse", &json),
            Err(Error::UnsupportedEventType(_))
        ));
    }
}
