use super::{KafkaTransactionalProducer, OutboundRecord, TransactionalBus};
use crate::{Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

fn transaction_error(step: &str, cause: impl std::fmt::Display) -> Error {
    Error::Transaction {
        message: format!("{}: {}", step, cause),
    }
}

/// Writes batches all-or-nothing through one producer session.
pub struct Publisher<B> {
    bus: B,
}

impl<B: TransactionalBus> Publisher<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Publishes `records` in a single transaction.
    ///
    /// Every send is awaited; the first failure aborts the transaction so
    /// none of the batch becomes visible. Cancelling `shutdown` while sends
    /// are outstanding aborts as well and returns [`Error::Cancelled`].
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn publish(
        &self,
        records: &[OutboundRecord],
        shutdown: &CancellationToken,
    ) -> Result<()> {
        self.bus
            .begin_transaction()
            .await
            .map_err(|e| transaction_error("failed to begin transaction", e))?;

        let outcome = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(Error::Cancelled),
            result = self.produce_all(records) => result,
        };

        match outcome {
            Ok(()) => {
                self.bus
                    .commit_transaction()
                    .await
                    .map_err(|e| transaction_error("failed to commit transaction", e))?;
                info!(count = records.len(), "Committed transaction");
                Ok(())
            }
            Err(Error::Cancelled) => {
                warn!("Publish cancelled, aborting transaction");
                self.rollback().await?;
                Err(Error::Cancelled)
            }
            Err(e) => {
                error!(error = %e, "Failed to produce records, aborting transaction");
                self.rollback().await?;
                Err(transaction_error("failed to produce messages", e))
            }
        }
    }

    /// Resolves once every send has, keeping the first error seen.
    async fn produce_all(&self, records: &[OutboundRecord]) -> Result<()> {
        let mut sends: FuturesUnordered<_> =
            records.iter().map(|r| self.bus.produce(r)).collect();

        let mut first_error = None;
        while let Some(result) = sends.next().await {
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn rollback(&self) -> Result<()> {
        self.bus.abort_buffered().await?;
        self.bus
            .abort_transaction()
            .await
            .map_err(|e| transaction_error("error aborting transaction", e))
    }
}

/// Opens a fresh producer session on `seeds` and publishes `records` in one
/// transaction.
pub async fn publish(
    seeds: &[String],
    records: &[OutboundRecord],
    shutdown: &CancellationToken,
) -> Result<()> {
    let producer = KafkaTransactionalProducer::connect(seeds).await?;
    Publisher::new(producer).publish(records, shutdown).await
}
