//! Consume → transform → produce loop hosting [`MaskingTransform`].

use super::{MaskingTransform, RecordHeader, TransformRecord};
use crate::config::REGISTRY_TIMEOUT;
use crate::registry::RegistryClient;
use crate::{Error, Result, TransformConfig, TransformError, TransformState};
use bytes::Bytes;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Header, Headers, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{ClientConfig, Message};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause after a consumer error before polling again.
pub const CONSUMER_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Clone, Copy)]
pub struct TransformStats {
    pub received: u64,
    pub emitted: u64,
    pub dropped: u64,
}

impl TransformRecord {
    pub fn from_message(message: &BorrowedMessage<'_>) -> Self {
        let headers = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|h| RecordHeader {
                        key: h.key.to_string(),
                        value: h.value.map(Bytes::copy_from_slice),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            key: message.key().map(Bytes::copy_from_slice),
            value: message
                .payload()
                .map(Bytes::copy_from_slice)
                .unwrap_or_default(),
            headers,
        }
    }
}

/// Runs the transform against the configured topics until `shutdown` fires.
///
/// Records that fail to transform or emit are logged and dropped; the loop
/// keeps going.
pub async fn run_transform(config: &TransformConfig, shutdown: CancellationToken) -> Result<TransformStats> {
    let registry = RegistryClient::new(&config.registry_url, REGISTRY_TIMEOUT)?;
    let transform = MaskingTransform::from_config(registry, config).await?;
    info!(
        destination_schema_id = config.destination_schema_id,
        unmasked_customers = transform.policy().len(),
        "Masking transform ready"
    );

    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", config.seeds.join(","))
        .set("group.id", &config.group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()?;
    consumer.subscribe(&[config.input_topic.as_str()])?;

    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", config.seeds.join(","))
        .set("acks", "all")
        .set("compression.type", "snappy")
        .create()?;

    info!(input = %config.input_topic, output = %config.output_topic, "Consuming");
    let mut stats = TransformStats::default();

    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested");
                break;
            }
            message = consumer.recv() => message,
        };

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Consumer error");
                if !pause_after_error(&shutdown, CONSUMER_ERROR_BACKOFF).await {
                    info!("Shutdown requested");
                    break;
                }
                continue;
            }
        };
        stats.received += 1;

        let record = TransformRecord::from_message(&message);
        let result = match transform.apply(&record).await {
            Ok(output) => emit(&producer, &config.output_topic, &output)
                .await
                .map_err(|e| TransformError::new(TransformState::Encoded, e)),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => stats.emitted += 1,
            Err(e) => {
                stats.dropped += 1;
                warn!(
                    partition = message.partition(),
                    offset = message.offset(),
                    state = %e.state,
                    error = %e.source,
                    "Dropping record"
                );
            }
        }
    }

    info!(
        received = stats.received,
        emitted = stats.emitted,
        dropped = stats.dropped,
        "Transform stopped"
    );
    Ok(stats)
}

/// Waits `delay` unless shutdown fires first; returns whether to keep running.
async fn pause_after_error(shutdown: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

async fn emit(producer: &FutureProducer, topic: &str, record: &TransformRecord) -> Result<()> {
    let mut headers = OwnedHeaders::new_with_capacity(record.headers.len());
    for header in &record.headers {
        headers = headers.insert(Header {
            key: &header.key,
            value: header.value.as_deref(),
        });
    }

    let mut message: FutureRecord<'_, [u8], [u8]> = FutureRecord::to(topic)
        .payload(&record.value[..])
        .headers(headers);
    if let Some(key) = &record.key {
        message = message.key(&key[..]);
    }

    producer
        .send(message, Timeout::After(SEND_TIMEOUT))
        .await
        .map_err(|(e, _)| Error::Kafka(e))?;
    Ok(())
}
