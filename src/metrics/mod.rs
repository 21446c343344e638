mod types;

pub use types::{MergeRecord, MetricsSnapshot, PathCounts};

use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RECENT_MERGES: usize = 20;

/// Ingest counters shared between the ingest loop and whoever wants to display them.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

#[derive(Default)]
struct MetricsState {
    recent_merges: Vec<MergeRecord>,
    batch_count: u64,
    sample_count: u64,
    rejected_batch_count: u64,
    discarded_publish_count: u64,
    paths: PathCounts,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_merge(&self, record: MergeRecord) {
        let mut state = self.inner.lock().await;

        state.batch_count += 1;
        state.sample_count += record.batch_len as u64;
        state.paths.bump(record.path);

        state.recent_merges.push(record);
        if state.recent_merges.len() > MAX_RECENT_MERGES {
            state.recent_merges.remove(0);
        }
    }

    /// A batch that could not be applied (wrong payload kind for its channel).
    pub async fn record_rejected(&self) {
        self.inner.lock().await.rejected_batch_count += 1;
    }

    /// A merge that finished after its session was cancelled and was never published.
    pub async fn record_discarded_publish(&self) {
        self.inner.lock().await.discarded_publish_count += 1;
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;
        MetricsSnapshot {
            recent_merges: state.recent_merges.clone(),
            batch_count: state.batch_count,
            sample_count: state.sample_count,
            rejected_batch_count: state.rejected_batch_count,
            discarded_publish_count: state.discarded_publish_count,
            paths: state.paths.clone(),
        }
    }

    pub async fn reset(&self) {
        *self.inner.lock().await = MetricsState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;
    use crate::timeseries::MergePath;
    use chrono::Utc;

    fn record(path: MergePath, batch_len: usize) -> MergeRecord {
        MergeRecord {
            timestamp: Utc::now(),
            channel: Channel::PulseTrace,
            path,
            batch_len,
            removed: 0,
            trimmed: 0,
            buffer_len: batch_len,
            smoothed_points: 0,
            merge_us: 3,
        }
    }

    #[tokio::test]
    async fn counts_batches_and_paths() {
        let metrics = MetricsCollector::new();
        metrics.record_merge(record(MergePath::Initial, 4)).await;
        metrics.record_merge(record(MergePath::Append, 2)).await;
        metrics.record_merge(record(MergePath::Append, 1)).await;
        metrics.record_rejected().await;

        let snapshot = metrics.get_snapshot().await;
        assert_eq!(snapshot.batch_count, 3);
        assert_eq!(snapshot.sample_count, 7);
        assert_eq!(snapshot.paths.initial, 1);
        assert_eq!(snapshot.paths.append, 2);
        assert_eq!(snapshot.rejected_batch_count, 1);
    }

    #[tokio::test]
    async fn keeps_only_recent_merges() {
        let metrics = MetricsCollector::new();
        for len in 0..(MAX_RECENT_MERGES + 5) {
            metrics.record_merge(record(MergePath::Append, len)).await;
        }

        let snapshot = metrics.get_snapshot().await;
        assert_eq!(snapshot.recent_merges.len(), MAX_RECENT_MERGES);
        assert_eq!(snapshot.recent_merges[0].batch_len, 5);

        metrics.reset().await;
        assert_eq!(metrics.get_snapshot().await.batch_count, 0);
    }
}
