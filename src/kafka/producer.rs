use super::{OutboundRecord, TransactionalBus};
use crate::event::generator::random_string;
use crate::{Error, Result};
use async_trait::async_trait;
use rdkafka::error::KafkaResult;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer, PurgeConfig};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Retries librdkafka makes per record before reporting failure.
pub const RECORD_RETRIES: u32 = 4;
pub const TRANSACTIONAL_ID_LEN: usize = 20;

const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Hands out partitions in turn, wrapping at the partition count.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_partition(&self, partition_count: usize) -> i32 {
        if partition_count == 0 {
            return 0;
        }
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        (n % partition_count) as i32
    }
}

/// Producer session with a fresh random transactional id.
pub struct KafkaTransactionalProducer {
    producer: FutureProducer,
    transactional_id: String,
    partitioner: RoundRobin,
    partition_counts: Mutex<HashMap<String, usize>>,
}

impl KafkaTransactionalProducer {
    /// Connects to `seeds` and initialises transactions.
    #[instrument(skip_all, fields(seeds = %seeds.join(",")))]
    pub async fn connect(seeds: &[String]) -> Result<Self> {
        let transactional_id = random_string(&mut rand::rng(), TRANSACTIONAL_ID_LEN);
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", seeds.join(","))
            .set("transactional.id", &transactional_id)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("message.send.max.retries", RECORD_RETRIES.to_string())
            .set("compression.type", "snappy")
            .create()?;

        let session = Self {
            producer,
            transactional_id,
            partitioner: RoundRobin::new(),
            partition_counts: Mutex::new(HashMap::new()),
        };
        session
            .blocking("init transactions", |p| {
                p.init_transactions(Timeout::After(TRANSACTION_TIMEOUT))
            })
            .await?;

        info!(transactional_id = %session.transactional_id, "Producer session ready");
        Ok(session)
    }

    pub fn transactional_id(&self) -> &str {
        &self.transactional_id
    }

    /// librdkafka's transaction calls block, so they run off the runtime.
    async fn blocking<F>(&self, step: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&FutureProducer) -> KafkaResult<()> + Send + 'static,
    {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || f(&producer))
            .await
            .map_err(|e| Error::Transaction {
                message: format!("{} task failed: {}", step, e),
            })?
            .map_err(Error::Kafka)
    }

    async fn partition_count(&self, topic: &str) -> Result<usize> {
        let mut counts = self.partition_counts.lock().await;
        if let Some(count) = counts.get(topic) {
            return Ok(*count);
        }

        let producer = self.producer.clone();
        let name = topic.to_string();
        let count = tokio::task::spawn_blocking(move || {
            producer
                .client()
                .fetch_metadata(Some(&name), METADATA_TIMEOUT)
                .map(|metadata| {
                    metadata
                        .topics()
                        .iter()
                        .find(|t| t.name() == name)
                        .map_or(0, |t| t.partitions().len())
                })
        })
        .await
        .map_err(|e| Error::Transaction {
            message: format!("metadata task failed: {}", e),
        })??;

        if count == 0 {
            return Err(Error::Transaction {
                message: format!("topic '{}' has no partitions", topic),
            });
        }

        debug!(topic, partitions = count, "Fetched partition count");
        counts.insert(topic.to_string(), count);
        Ok(count)
    }
}

#[async_trait]
impl TransactionalBus for KafkaTransactionalProducer {
    async fn begin_transaction(&self) -> Result<()> {
        self.producer.begin_transaction()?;
        Ok(())
    }

    async fn produce(&self, record: &OutboundRecord) -> Result<()> {
        let partition = self
            .partitioner
            .next_partition(self.partition_count(&record.topic).await?);

        let mut message: FutureRecord<'_, [u8], [u8]> = FutureRecord::to(&record.topic)
            .payload(&record.value[..])
            .partition(partition);
        if let Some(key) = &record.key {
            message = message.key(&key[..]);
        }

        self.producer
            .send(message, Timeout::Never)
            .await
            .map_err(|(e, _)| Error::Kafka(e))?;
        Ok(())
    }

    /// Drops records still queued locally, e.g. when a cancelled publish
    /// left sends outstanding. In-flight requests finish or fail on abort.
    async fn abort_buffered(&self) -> Result<()> {
        self.blocking("purge queued records", |p| {
            p.purge(PurgeConfig::default().queue());
            Ok(())
        })
        .await
    }

    async fn abort_transaction(&self) -> Result<()> {
        self.blocking("abort transaction", |p| {
            p.abort_transaction(Timeout::After(TRANSACTION_TIMEOUT))
        })
        .await
    }

    async fn commit_transaction(&self) -> Result<()> {
        self.blocking("commit transaction", |p| {
            p.commit_transaction(Timeout::After(TRANSACTION_TIMEOUT))
        })
        .await
    }
}
