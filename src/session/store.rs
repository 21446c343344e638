use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{Channel, SmoothedPoint};

use super::snapshot::{ChannelSnapshot, SeriesSnapshot};

#[derive(Default)]
struct StoreInner {
    generation: u64,
    channels: HashMap<Channel, ChannelSnapshot>,
}

/// Latest published snapshot per channel, readable from any thread.
///
/// Publishing swaps an `Arc`; the lock is only held for that swap or for cloning one snapshot
/// out, never while a merge runs. Each publish is tagged with the session generation it was
/// computed for, and publishes from an older generation are dropped.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Discard everything and move to a new generation. Returns the new generation.
    pub fn begin_generation(&self) -> u64 {
        let mut inner = self.write();
        inner.generation += 1;
        inner.channels.clear();
        inner.generation
    }

    /// Swap in a channel snapshot. Returns false if `generation` is no longer current.
    pub fn publish(&self, generation: u64, snapshot: ChannelSnapshot) -> bool {
        let mut inner = self.write();
        if inner.generation != generation {
            return false;
        }
        inner.channels.insert(snapshot.channel, snapshot);
        true
    }

    pub fn snapshot(&self, channel: Channel) -> ChannelSnapshot {
        self.read()
            .channels
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| ChannelSnapshot::empty(channel))
    }

    pub fn merged_buffer(&self, channel: Channel) -> SeriesSnapshot {
        self.snapshot(channel).merged
    }

    pub fn smoothed_buffer(&self, channel: Channel) -> Arc<Vec<SmoothedPoint>> {
        self.snapshot(channel).smoothed
    }

    pub fn latest_value(&self, channel: Channel) -> Option<f64> {
        self.snapshot(channel).latest_value()
    }

    pub fn latest_state(&self, channel: Channel) -> Option<bool> {
        self.snapshot(channel).latest_state()
    }

    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.read().channels.keys().copied().collect();
        channels.sort();
        channels
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
