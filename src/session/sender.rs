use anyhow::{anyhow, Result};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::models::{Batch, Channel, ChannelBatch, MetricsBuffer};

/// Engine-side handle for queueing batches into a running session.
///
/// Cheap to clone. Once the session stops or resets every clone starts returning errors.
#[derive(Clone)]
pub struct BatchSender {
    tx: mpsc::Sender<ChannelBatch>,
}

impl BatchSender {
    pub(crate) fn new(tx: mpsc::Sender<ChannelBatch>) -> Self {
        Self { tx }
    }

    /// Queue a batch, waiting for room if the ingest loop is behind.
    pub async fn send(&self, channel: Channel, batch: Batch) -> Result<()> {
        self.send_batch(ChannelBatch { channel, batch }).await
    }

    pub async fn send_batch(&self, batch: ChannelBatch) -> Result<()> {
        let channel = batch.channel;
        self.tx
            .send(batch)
            .await
            .map_err(|_| anyhow!("session closed; dropped batch for {channel}"))
    }

    /// Queue every series of a decoded engine payload.
    pub async fn send_metrics_buffer(&self, buffer: MetricsBuffer) -> Result<usize> {
        let batches = buffer.into_batches();
        let count = batches.len();
        for batch in batches {
            self.send_batch(batch).await?;
        }
        Ok(count)
    }

    /// Queue without waiting; fails if the queue is full or the session is closed.
    pub fn try_send(&self, channel: Channel, batch: Batch) -> Result<()> {
        self.tx
            .try_send(ChannelBatch { channel, batch })
            .map_err(|err| match err {
                TrySendError::Full(_) => anyhow!("ingest queue full; dropped batch for {channel}"),
                TrySendError::Closed(_) => anyhow!("session closed; dropped batch for {channel}"),
            })
    }

    /// Queue from a plain (non-async) engine callback thread, waiting for room.
    ///
    /// Panics if called from inside an async context, like `tokio::sync::mpsc::Sender::blocking_send`.
    pub fn blocking_send(&self, channel: Channel, batch: Batch) -> Result<()> {
        self.tx
            .blocking_send(ChannelBatch { channel, batch })
            .map_err(|_| anyhow!("session closed; dropped batch for {channel}"))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
