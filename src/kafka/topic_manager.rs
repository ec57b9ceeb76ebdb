use crate::{Error, Result};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_PARTITIONS: i32 = 3;
pub const DEFAULT_REPLICATION_FACTOR: i32 = 1;

/// Creates destination topics on first use.
pub struct TopicManager {
    admin_client: AdminClient<DefaultClientContext>,
    partitions: i32,
    replication_factor: i32,
    known_topics: HashSet<String>,
}

impl TopicManager {
    pub fn new(seeds: &[String]) -> Result<Self> {
        Self::with_layout(seeds, DEFAULT_PARTITIONS, DEFAULT_REPLICATION_FACTOR)
    }

    pub fn with_layout(seeds: &[String], partitions: i32, replication_factor: i32) -> Result<Self> {
        let admin_client: AdminClient<_> = ClientConfig::new()
            .set("bootstrap.servers", seeds.join(","))
            .create()?;

        Ok(Self {
            admin_client,
            partitions,
            replication_factor,
            known_topics: HashSet::new(),
        })
    }

    #[instrument(skip(self))]
    pub async fn ensure_topic_exists(&mut self, topic: &str) -> Result<()> {
        if self.known_topics.contains(topic) {
            debug!("Topic already verified");
            return Ok(());
        }

        match self.topic_exists(topic).await {
            Ok(true) => debug!("Topic exists"),
            Ok(false) => {
                info!("Creating topic");
                self.create_topic(topic).await?;
            }
            Err(e) => {
                warn!(error = %e, "Failed to check whether topic exists");
                return Err(e);
            }
        }

        self.known_topics.insert(topic.to_string());
        Ok(())
    }

    pub async fn topic_exists(&self, topic: &str) -> Result<bool> {
        let client = self.admin_client.inner();
        let metadata = client.fetch_metadata(Some(topic), Duration::from_secs(5))?;

        Ok(metadata
            .topics()
            .iter()
            .any(|t| t.name() == topic && t.error().is_none() && !t.partitions().is_empty()))
    }

    async fn create_topic(&self, topic: &str) -> Result<()> {
        let new_topic = NewTopic::new(
            topic,
            self.partitions,
            TopicReplication::Fixed(self.replication_factor),
        )
        .set("cleanup.policy", "delete")
        .set("compression.type", "snappy");

        let opts = AdminOptions::new().operation_timeout(Some(Duration::from_secs(30)));

        let results = self.admin_client.create_topics(&[new_topic], &opts).await?;
        for result in results {
            match result {
                Ok(name) => info!(topic = %name, "Created topic"),
                // Another loader got there first
                Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    debug!("Topic created concurrently")
                }
                Err((_, code)) => return Err(Error::Kafka(KafkaError::AdminOp(code))),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires a running broker
    async fn test_topic_creation() {
        let mut manager = TopicManager::new(&["localhost:9092".to_string()]).unwrap();
        let topic = format!("pii-transform-topic-{}", std::process::id());

        manager.ensure_topic_exists(&topic).await.unwrap();
        assert!(manager.topic_exists(&topic).await.unwrap());

        // Second call is served from the known set
        manager.ensure_topic_exists(&topic).await.unwrap();
    }
}
