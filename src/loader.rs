//! Loads a JSON event file onto the bus in one transaction.

use crate::avro::AvroCodec;
use crate::config::REGISTRY_TIMEOUT;
use crate::event::convert_events;
use crate::kafka::{publish, KeyStrategy, OutboundRecord, TopicManager};
use crate::registry::{RegistryClient, SchemaCache};
use crate::{LoaderConfig, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Converts and frames every event in `json`, ready for publishing.
pub fn build_records(
    codec: &AvroCodec,
    kind: &str,
    json: &[u8],
    topic: &str,
    keys: &KeyStrategy,
) -> Result<Vec<OutboundRecord>> {
    convert_events(kind, json)?
        .into_iter()
        .map(|(event, datum)| -> Result<OutboundRecord> {
            let value = codec.encode_framed(&datum)?;
            Ok(OutboundRecord::new(topic, keys.extract_key(&event), value))
        })
        .collect()
}

/// Reads `path`, encodes its events with the destination schema and
/// publishes them. Returns the number of records committed.
#[instrument(skip(config, keys, shutdown), fields(topic = %config.destination_topic))]
pub async fn load_file(
    config: &LoaderConfig,
    path: &Path,
    kind: &str,
    keys: &KeyStrategy,
    shutdown: CancellationToken,
) -> Result<usize> {
    let json = tokio::fs::read(path).await?;

    let schemas = SchemaCache::new(RegistryClient::new(&config.registry_url, REGISTRY_TIMEOUT)?);
    let codec = schemas.codec(config.destination_schema_id).await?;

    let records = build_records(&codec, kind, &json, &config.destination_topic, keys)?;
    if records.is_empty() {
        info!("No events in file");
        return Ok(0);
    }

    TopicManager::new(&config.seeds)?
        .ensure_topic_exists(&config.destination_topic)
        .await?;
    publish(&config.seeds, &records, &shutdown).await?;

    info!(count = records.len(), "Loaded events");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::{decode_datum, HEADER_LEN};
    use crate::event::DEMO_EVENT_SCHEMA;
    use crate::Error;

    const EVENTS: &str = r#"[
        {
            "metadata": {
                "message_key": "first", "created_date": 1296997036167,
                "updated_date": 1296997036167, "outbox_published_date": 1296997036167,
                "event_type": "INSERT"
            },
            "business_data_payload": {"id": "PK000001", "last_name": "Jones"}
        },
        {
            "metadata": {
                "message_key": "second", "created_date": 4000,
                "updated_date": "2008-02-19T21:24:13Z", "outbox_published_date": 1296997036167,
                "event_type": "DELETE"
            },
            "business_data_payload": {"id": "PK000002"}
        }
    ]"#;

    #[test]
    fn test_build_records() {
        let codec = AvroCodec::parse(5, DEMO_EVENT_SCHEMA).unwrap();
        let records =
            build_records(&codec, "demoEvent", EVENTS.as_bytes(), "demo", &KeyStrategy::MessageKey).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].topic, "demo");
        assert_eq!(records[1].key.as_deref(), Some(&b"second"[..]));
        assert_eq!(&records[0].value[..HEADER_LEN], &[0, 0, 0, 0, 5]);
        decode_datum(&records[1].value[HEADER_LEN..], codec.schema()).unwrap();
    }

    #[test]
    fn test_unknown_kind() {
        let codec = AvroCodec::parse(5, DEMO_EVENT_SCHEMA).unwrap();
        let err = build_records(&codec, "orderEvent", EVENTS.as_bytes(), "demo", &KeyStrategy::None)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedEventType(ref kind) if kind == "orderEvent"));
    }

    #[test]
    fn test_empty_file_builds_nothing() {
        let codec = AvroCodec::parse(5, DEMO_EVENT_SCHEMA).unwrap();
        let records = build_records(&codec, "demoEvent", b"[]", "demo", &KeyStrategy::None).unwrap();
        assert!(records.is_empty());
    }
}
