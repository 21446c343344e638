use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Channel;
use crate::timeseries::MergePath;

/// Timing and shape of one applied batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRecord {
    pub timestamp: DateTime<Utc>,
    pub channel: Channel,
    pub path: MergePath,
    pub batch_len: usize,
    pub removed: usize,
    pub trimmed: usize,
    pub buffer_len: usize,
    pub smoothed_points: usize,
    pub merge_us: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathCounts {
    pub empty: u64,
    pub initial: u64,
    pub append: u64,
    pub overlap_extend: u64,
    pub contained: u64,
}

impl PathCounts {
    pub fn bump(&mut self, path: MergePath) {
        let slot = match path {
            MergePath::Empty => &mut self.empty,
            MergePath::Initial => &mut self.initial,
            MergePath::Append => &mut self.append,
            MergePath::OverlapExtend => &mut self.overlap_extend,
            MergePath::Contained => &mut self.contained,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub recent_merges: Vec<MergeRecord>,
    pub batch_count: u64,
    pub sample_count: u64,
    pub rejected_batch_count: u64,
    pub discarded_publish_count: u64,
    pub paths: PathCounts,
}
