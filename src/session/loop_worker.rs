use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::metrics::{MergeRecord, MetricsCollector};
use crate::models::ChannelBatch;

use super::context::SessionContext;
use super::observer::ObserverRegistry;
use super::store::SnapshotStore;

// Set to false to silence per-batch logging from the ingest loop
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Everything the ingest task needs besides its queue.
pub(crate) struct IngestWorker {
    pub context: SessionContext,
    pub store: SnapshotStore,
    pub observers: ObserverRegistry,
    pub metrics: MetricsCollector,
}

/// Apply queued batches one at a time until cancelled, drained, or every sender is gone.
///
/// `drain_rx` flipping to true stops intake but still applies what is already queued.
/// Cancellation stops immediately; a merge already running finishes but is not published.
/// Returns the number of batches published.
pub(crate) async fn ingest_loop(
    mut worker: IngestWorker,
    mut batch_rx: mpsc::Receiver<ChannelBatch>,
    mut drain_rx: watch::Receiver<bool>,
    cancel_token: CancellationToken,
) -> u64 {
    let generation = worker.context.generation();
    let mut applied: u64 = 0;
    let mut draining = false;

    log_info!("ingest loop started (generation {})", generation);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("ingest loop cancelled (generation {}), {} batches applied", generation, applied);
                break;
            }
            changed = drain_rx.changed(), if !draining => {
                if changed.is_err() || *drain_rx.borrow() {
                    log_info!("ingest loop draining (generation {})", generation);
                    draining = true;
                    batch_rx.close();
                }
            }
            maybe_batch = batch_rx.recv() => {
                let Some(batch) = maybe_batch else {
                    log_info!("ingest queue closed (generation {}), {} batches applied", generation, applied);
                    break;
                };
                if apply_batch(&mut worker, batch, &cancel_token).await {
                    applied += 1;
                }
            }
        }
    }

    applied
}

async fn apply_batch(
    worker: &mut IngestWorker,
    batch: ChannelBatch,
    cancel_token: &CancellationToken,
) -> bool {
    let ChannelBatch { channel, batch } = batch;
    let batch_len = batch.len();
    let merge_start = Instant::now();

    let update = match worker.context.merge_batch(channel, batch) {
        Ok(update) => update,
        Err(err) => {
            log_warn!("dropping batch of {} samples: {err:#}", batch_len);
            worker.metrics.record_rejected().await;
            return false;
        }
    };
    let merge_us = merge_start.elapsed().as_micros() as u64;

    if cancel_token.is_cancelled()
        || !worker
            .store
            .publish(worker.context.generation(), update.snapshot.clone())
    {
        log_debug!("discarding merge for {} from a cancelled session", channel);
        worker.metrics.record_discarded_publish().await;
        return false;
    }

    worker.observers.notify_updated(&update.snapshot);

    log_debug!(
        "merged {} samples into {} via {:?} ({} replaced, {} trimmed, {} smoothed) in {}us",
        batch_len,
        channel,
        update.outcome.path,
        update.outcome.removed,
        update.trimmed,
        update.smoothed_points,
        merge_us
    );

    worker
        .metrics
        .record_merge(MergeRecord {
            timestamp: Utc::now(),
            channel,
            path: update.outcome.path,
            batch_len,
            removed: update.outcome.removed,
            trimmed: update.trimmed,
            buffer_len: update.snapshot.merged.len(),
            smoothed_points: update.smoothed_points,
            merge_us,
        })
        .await;

    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{Channel, Measurement};
    use crate::session::observer::UpdateLog;
    use crate::settings::SessionConfig;

    fn worker(store: &SnapshotStore, generation: u64) -> (IngestWorker, Arc<UpdateLog>) {
        let observers = ObserverRegistry::new();
        let log = Arc::new(UpdateLog::new());
        observers.register(log.clone());
        let worker = IngestWorker {
            context: SessionContext::with_generation(SessionConfig::default(), generation).unwrap(),
            store: store.clone(),
            observers,
            metrics: MetricsCollector::new(),
        };
        (worker, log)
    }

    fn pulse(times: &[f64]) -> ChannelBatch {
        ChannelBatch::measurements(
            Channel::PulseRate,
            times.iter().map(|&t| Measurement::new(t, 60.0)).collect(),
        )
    }

    #[tokio::test]
    async fn merge_finishing_after_cancel_is_not_published() {
        let store = SnapshotStore::new();
        let generation = store.begin_generation();
        let (mut worker, log) = worker(&store, generation);

        assert!(apply_batch(&mut worker, pulse(&[1.0]), &CancellationToken::new()).await);
        let before = store.merged_buffer(Channel::PulseRate).times();

        let cancel_token = CancellationToken::new();
        cancel_token.cancel();
        assert!(!apply_batch(&mut worker, pulse(&[1.0, 2.0]), &cancel_token).await);

        // The merge itself ran; only the publish was skipped.
        assert_eq!(worker.context.merged_buffer(Channel::PulseRate).len(), 2);
        assert_eq!(store.merged_buffer(Channel::PulseRate).times(), before);
        assert_eq!(log.updates(), vec![(Channel::PulseRate, 1)]);

        let metrics = worker.metrics.get_snapshot().await;
        assert_eq!(metrics.discarded_publish_count, 1);
        assert_eq!(metrics.batch_count, 1);
    }

    #[tokio::test]
    async fn merge_for_a_replaced_generation_is_not_published() {
        let store = SnapshotStore::new();
        let generation = store.begin_generation();
        let (mut worker, log) = worker(&store, generation);
        store.begin_generation();

        assert!(!apply_batch(&mut worker, pulse(&[1.0]), &CancellationToken::new()).await);
        assert!(store.merged_buffer(Channel::PulseRate).is_empty());
        assert!(log.updates().is_empty());
        assert_eq!(worker.metrics.get_snapshot().await.discarded_publish_count, 1);
    }

    #[tokio::test]
    async fn cancelled_loop_leaves_queued_batches_unapplied() {
        let store = SnapshotStore::new();
        let generation = store.begin_generation();
        let (worker, log) = worker(&store, generation);
        let metrics = worker.metrics.clone();

        let (batch_tx, batch_rx) = tokio::sync::mpsc::channel(4);
        let (_drain_tx, drain_rx) = tokio::sync::watch::channel(false);
        batch_tx.send(pulse(&[1.0])).await.unwrap();
        batch_tx.send(pulse(&[2.0])).await.unwrap();

        let cancel_token = CancellationToken::new();
        cancel_token.cancel();
        let applied = ingest_loop(worker, batch_rx, drain_rx, cancel_token).await;

        assert_eq!(applied, 0);
        assert!(store.merged_buffer(Channel::PulseRate).is_empty());
        assert!(log.updates().is_empty());
        assert!(batch_tx.is_closed());
        assert_eq!(metrics.get_snapshot().await.batch_count, 0);
    }

    #[tokio::test]
    async fn drain_applies_queued_batches_then_stops() {
        let store = SnapshotStore::new();
        let generation = store.begin_generation();
        let (worker, _log) = worker(&store, generation);

        let (batch_tx, batch_rx) = tokio::sync::mpsc::channel(4);
        let (drain_tx, drain_rx) = tokio::sync::watch::channel(false);
        batch_tx.send(pulse(&[1.0])).await.unwrap();
        batch_tx.send(pulse(&[2.0])).await.unwrap();
        drain_tx.send(true).unwrap();

        let applied = ingest_loop(worker, batch_rx, drain_rx, CancellationToken::new()).await;

        assert_eq!(applied, 2);
        assert_eq!(store.merged_buffer(Channel::PulseRate).times(), vec![1.0, 2.0]);
        assert!(batch_tx.send(pulse(&[3.0])).await.is_err());
    }
}
