use serde::Serialize;

use crate::models::TimeStamped;

use super::search::{is_sorted_by_time, SortedByTime};

/// Which branch of the merge handled a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MergePath {
    /// Empty batch, nothing changed.
    Empty,
    /// Series was empty and became the batch.
    Initial,
    /// Batch starts strictly after the series ends.
    Append,
    /// Batch overlaps the tail and extends past it.
    OverlapExtend,
    /// Batch lies within the existing time range.
    Contained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub path: MergePath,
    /// Existing samples replaced by the batch.
    pub removed: usize,
    /// Batch samples now in the series.
    pub added: usize,
}

impl MergeOutcome {
    fn new(path: MergePath, removed: usize, added: usize) -> Self {
        Self {
            path,
            removed,
            added,
        }
    }
}

/// Fold a sorted batch into a sorted series.
///
/// The batch is the engine's current view from `batch[0].time` onward: every existing sample at
/// or after that time is dropped and the batch takes its place. Samples before the overlap are
/// untouched. This holds whether or not the batch reaches past the old end.
///
/// Both inputs must be sorted ascending by time; this is only checked in debug builds.
pub fn merge_sorted<T: TimeStamped>(series: &mut Vec<T>, batch: Vec<T>) -> MergeOutcome {
    debug_assert!(is_sorted_by_time(series.as_slice()), "series is not sorted by time");
    debug_assert!(is_sorted_by_time(batch.as_slice()), "batch is not sorted by time");

    let (Some(first_new), Some(last_new)) = (batch.first(), batch.last()) else {
        return MergeOutcome::new(MergePath::Empty, 0, 0);
    };
    let (first_new, last_new) = (first_new.time(), last_new.time());

    let Some(last_existing) = series.last().map(TimeStamped::time) else {
        let added = batch.len();
        *series = batch;
        return MergeOutcome::new(MergePath::Initial, 0, added);
    };

    if first_new > last_existing {
        let added = batch.len();
        series.extend(batch);
        return MergeOutcome::new(MergePath::Append, 0, added);
    }

    let overlap_start = series.insertion_index(first_new);
    let added = batch.len();
    let removed = series.len() - overlap_start;
    let path = if last_new > last_existing {
        MergePath::OverlapExtend
    } else {
        MergePath::Contained
    };

    series.truncate(overlap_start);
    series.extend(batch);
    MergeOutcome::new(path, removed, added)
}

/// Drop the oldest samples so at most `capacity` remain. Returns how many were dropped.
pub fn trim_to_capacity<T>(series: &mut Vec<T>, capacity: usize) -> usize {
    let excess = series.len().saturating_sub(capacity);
    if excess > 0 {
        series.drain(..excess);
    }
    excess
}
