use std::sync::Arc;

use crate::models::{Channel, ChannelKind, DetectionStatus, Measurement, SmoothedPoint, TimeStamped};

/// Immutable view of one channel's merged samples.
///
/// Cloning is a reference-count bump; later merges never change a snapshot already handed out.
#[derive(Debug, Clone)]
pub enum SeriesSnapshot {
    Measurements(Arc<Vec<Measurement>>),
    Detections(Arc<Vec<DetectionStatus>>),
}

impl SeriesSnapshot {
    pub fn empty(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Continuous => SeriesSnapshot::Measurements(Arc::default()),
            ChannelKind::Detection => SeriesSnapshot::Detections(Arc::default()),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            SeriesSnapshot::Measurements(_) => ChannelKind::Continuous,
            SeriesSnapshot::Detections(_) => ChannelKind::Detection,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeriesSnapshot::Measurements(samples) => samples.len(),
            SeriesSnapshot::Detections(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_measurements(&self) -> Option<&[Measurement]> {
        match self {
            SeriesSnapshot::Measurements(samples) => Some(samples.as_slice()),
            SeriesSnapshot::Detections(_) => None,
        }
    }

    pub fn as_detections(&self) -> Option<&[DetectionStatus]> {
        match self {
            SeriesSnapshot::Detections(samples) => Some(samples.as_slice()),
            SeriesSnapshot::Measurements(_) => None,
        }
    }

    pub fn times(&self) -> Vec<f64> {
        match self {
            SeriesSnapshot::Measurements(samples) => samples.iter().map(TimeStamped::time).collect(),
            SeriesSnapshot::Detections(samples) => samples.iter().map(TimeStamped::time).collect(),
        }
    }

    pub fn last_time(&self) -> Option<f64> {
        match self {
            SeriesSnapshot::Measurements(samples) => samples.last().map(TimeStamped::time),
            SeriesSnapshot::Detections(samples) => samples.last().map(TimeStamped::time),
        }
    }

    /// The newest `count` samples as their own snapshot.
    pub fn recent(&self, count: usize) -> SeriesSnapshot {
        if count >= self.len() {
            return self.clone();
        }
        match self {
            SeriesSnapshot::Measurements(samples) => {
                SeriesSnapshot::Measurements(Arc::new(tail(samples, count).to_vec()))
            }
            SeriesSnapshot::Detections(samples) => {
                SeriesSnapshot::Detections(Arc::new(tail(samples, count).to_vec()))
            }
        }
    }

    /// `(time, value)` pairs for the newest `recent` samples, detections drawn as 1.0 / 0.0.
    pub fn plot_points(&self, recent: usize) -> Vec<(f64, f64)> {
        match self {
            SeriesSnapshot::Measurements(samples) => tail(samples, recent)
                .iter()
                .map(|s| (s.time, s.value))
                .collect(),
            SeriesSnapshot::Detections(samples) => tail(samples, recent)
                .iter()
                .map(|s| (s.time, s.plot_value()))
                .collect(),
        }
    }
}

/// Everything a reader can see of one channel at a point in time.
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub channel: Channel,
    pub merged: SeriesSnapshot,
    /// Debounced series; always empty for continuous channels.
    pub smoothed: Arc<Vec<SmoothedPoint>>,
}

impl ChannelSnapshot {
    pub fn empty(channel: Channel) -> Self {
        Self {
            channel,
            merged: SeriesSnapshot::empty(channel.kind()),
            smoothed: Arc::default(),
        }
    }

    /// Newest merged value of a continuous channel (e.g. the current pulse rate).
    pub fn latest_value(&self) -> Option<f64> {
        self.merged
            .as_measurements()
            .and_then(<[Measurement]>::last)
            .map(|sample| sample.value)
    }

    /// Newest debounced state of a detection channel.
    pub fn latest_state(&self) -> Option<bool> {
        self.smoothed.last().map(|point| point.state)
    }

    pub fn smoothed_plot_points(&self, recent: usize) -> Vec<(f64, f64)> {
        tail(&self.smoothed, recent)
            .iter()
            .map(|point| (point.time, point.plot_value()))
            .collect()
    }
}

fn tail<T>(samples: &[T], recent: usize) -> &[T] {
    &samples[samples.len().saturating_sub(recent)..]
}
