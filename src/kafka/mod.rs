//! Transactional publishing to Kafka-compatible brokers.
//!
//! A batch of [`OutboundRecord`]s is written inside one producer transaction:
//! either every record is committed or none is. The broker side is behind the
//! [`TransactionalBus`] trait so the all-or-nothing protocol can be driven
//! against something other than a live cluster.

pub mod key_strategy;
pub mod producer;
pub mod publisher;
pub mod topic_manager;


use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

pub use key_strategy::KeyStrategy;
pub use producer::{KafkaTransactionalProducer, RoundRobin};
pub use publisher::{publish, Publisher};
pub use topic_manager::TopicManager;

/// A record queued for a transactional batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub topic: String,
    pub key: Option<Bytes>,
    /// Framed Avro value: wire header followed by the datum.
    pub value: Bytes,
}

impl OutboundRecord {
    pub fn new(topic: impl Into<String>, key: Option<Bytes>, value: Bytes) -> Self {
        Self {
            topic: topic.into(),
            key,
            value,
        }
    }
}

/// One producer session able to run transactions.
#[async_trait]
pub trait TransactionalBus: Send + Sync {
    async fn begin_transaction(&self) -> Result<()>;

    /// Sends one record within the open transaction, resolving once the
    /// broker has acknowledged it.
    async fn produce(&self, record: &OutboundRecord) -> Result<()>;

    /// Drops records queued in the client but not yet sent.
    async fn abort_buffered(&self) -> Result<()>;

    async fn abort_transaction(&self) -> Result<()>;

    async fn commit_transaction(&self) -> Result<()>;
}
