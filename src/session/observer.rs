use std::sync::{Arc, RwLock};

use crate::models::Channel;

use super::snapshot::ChannelSnapshot;

/// Push-side consumer of session updates (UI bindings, telemetry forwarders).
///
/// Called on the ingest task right after a snapshot is published, so implementations should
/// hand the snapshot off rather than do slow work inline.
pub trait SessionObserver: Send + Sync {
    fn on_channel_updated(&self, snapshot: &ChannelSnapshot);

    fn on_session_reset(&self, _generation: u64) {}
}

#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Arc<RwLock<Vec<Arc<dyn SessionObserver>>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn SessionObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify_updated(&self, snapshot: &ChannelSnapshot) {
        for observer in self.current() {
            observer.on_channel_updated(snapshot);
        }
    }

    pub fn notify_reset(&self, generation: u64) {
        for observer in self.current() {
            observer.on_session_reset(generation);
        }
    }

    // Clone the list so observers run without the lock held.
    fn current(&self) -> Vec<Arc<dyn SessionObserver>> {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Observer that records which channels were updated. Handy for hosts that poll.
#[derive(Default)]
pub struct UpdateLog {
    updates: RwLock<Vec<(Channel, usize)>>,
    resets: RwLock<Vec<u64>>,
}

impl UpdateLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(channel, merged length)` per update, oldest first.
    pub fn updates(&self) -> Vec<(Channel, usize)> {
        self.updates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn resets(&self) -> Vec<u64> {
        self.resets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SessionObserver for UpdateLog {
    fn on_channel_updated(&self, snapshot: &ChannelSnapshot) {
        self.updates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((snapshot.channel, snapshot.merged.len()));
    }

    fn on_session_reset(&self, generation: u64) {
        self.resets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(generation);
    }
}
