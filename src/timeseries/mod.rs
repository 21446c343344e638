pub mod merge;
pub mod search;

pub use merge::{merge_sorted, trim_to_capacity, MergeOutcome, MergePath};
pub use search::{is_sorted_by_time, SortedByTime};
