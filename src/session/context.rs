use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::models::{Batch, Channel, DetectionStatus, SmoothedPoint};
use crate::settings::SessionConfig;
use crate::smoothing::DetectionSmoother;
use crate::timeseries::{merge_sorted, trim_to_capacity, MergeOutcome, SortedByTime};

use super::snapshot::{ChannelSnapshot, SeriesSnapshot};

/// Result of applying one batch to a channel.
#[derive(Debug, Clone)]
pub struct ChannelUpdate {
    pub outcome: MergeOutcome,
    /// Samples dropped from the front to respect the channel capacity.
    pub trimmed: usize,
    /// Points appended to the smoothed series (detection channels only).
    pub smoothed_points: usize,
    pub snapshot: ChannelSnapshot,
}

struct DetectionTrack {
    smoother: DetectionSmoother,
    smoothed: Arc<Vec<SmoothedPoint>>,
    /// Newest raw time already fed to the smoother.
    smoothed_through: Option<f64>,
}

impl DetectionTrack {
    /// Smooth the part of `batch` that is newer than anything seen so far.
    fn absorb(&mut self, batch: &[DetectionStatus]) -> usize {
        let fresh_from = self
            .smoothed_through
            .map_or(0, |seen| batch.insertion_index_strict(seen));
        let fresh = &batch[fresh_from..];
        if let Some(last) = fresh.last() {
            self.smoothed_through = Some(last.time);
        }

        let points = self.smoother.smooth(fresh);
        let count = points.len();
        Arc::make_mut(&mut self.smoothed).extend(points);
        count
    }
}

struct ChannelBuffer {
    merged: SeriesSnapshot,
    detection: Option<DetectionTrack>,
}

impl ChannelBuffer {
    fn new(channel: Channel, config: &SessionConfig) -> Self {
        let detection = channel.is_detection().then(|| DetectionTrack {
            smoother: DetectionSmoother::new(
                config.smoothing.for_channel(channel).unwrap_or_default(),
            ),
            smoothed: Arc::default(),
            smoothed_through: None,
        });
        Self {
            merged: SeriesSnapshot::empty(channel.kind()),
            detection,
        }
    }

    fn snapshot(&self, channel: Channel) -> ChannelSnapshot {
        ChannelSnapshot {
            channel,
            merged: self.merged.clone(),
            smoothed: self
                .detection
                .as_ref()
                .map(|track| Arc::clone(&track.smoothed))
                .unwrap_or_default(),
        }
    }
}

/// Every channel buffer and smoother of one measurement session.
///
/// Single writer: all mutation goes through `&mut self`. Readers take [`ChannelSnapshot`]s, which
/// share storage with the context until the next merge touches that channel (copy-on-write).
pub struct SessionContext {
    config: SessionConfig,
    generation: u64,
    channels: BTreeMap<Channel, ChannelBuffer>,
}

impl SessionContext {
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_generation(config, 0)
    }

    pub(crate) fn with_generation(config: SessionConfig, generation: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            generation,
            channels: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Channels that have received at least one batch since the last reset.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.channels.keys().copied()
    }

    /// Fold a batch into its channel's buffer and, for detection channels, smooth the new samples.
    ///
    /// The batch must be sorted ascending by time. It may be empty, or overlap the existing
    /// buffer in any way; see [`merge_sorted`]. Fails only when the payload kind does not
    /// match the channel.
    pub fn merge_batch(&mut self, channel: Channel, batch: Batch) -> Result<ChannelUpdate> {
        if batch.kind() != channel.kind() {
            bail!(
                "channel {} expects {:?} samples but the batch carries {:?}",
                channel,
                channel.kind(),
                batch.kind()
            );
        }

        let capacity = self.config.max_samples_per_channel;
        let buffer = self
            .channels
            .entry(channel)
            .or_insert_with(|| ChannelBuffer::new(channel, &self.config));

        let mut trimmed = 0;
        let mut smoothed_points = 0;
        let outcome = match (&mut buffer.merged, batch) {
            (SeriesSnapshot::Measurements(samples), Batch::Measurements(batch)) => {
                let samples = Arc::make_mut(samples);
                let outcome = merge_sorted(samples, batch);
                if let Some(capacity) = capacity {
                    trimmed = trim_to_capacity(samples, capacity);
                }
                outcome
            }
            (SeriesSnapshot::Detections(samples), Batch::Detections(batch)) => {
                if let Some(track) = buffer.detection.as_mut() {
                    smoothed_points = track.absorb(&batch);
                    if let Some(capacity) = capacity {
                        trim_to_capacity(Arc::make_mut(&mut track.smoothed), capacity);
                    }
                }
                let samples = Arc::make_mut(samples);
                let outcome = merge_sorted(samples, batch);
                if let Some(capacity) = capacity {
                    trimmed = trim_to_capacity(samples, capacity);
                }
                outcome
            }
            (merged, batch) => bail!(
                "channel {} buffer holds {:?} samples but the batch carries {:?}",
                channel,
                merged.kind(),
                batch.kind()
            ),
        };

        Ok(ChannelUpdate {
            outcome,
            trimmed,
            smoothed_points,
            snapshot: buffer.snapshot(channel),
        })
    }

    pub fn snapshot(&self, channel: Channel) -> ChannelSnapshot {
        self.channels
            .get(&channel)
            .map(|buffer| buffer.snapshot(channel))
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

    /// Drop every buffer and smoother. Channels come back empty with fresh smoothing state.
    pub fn reset(&mut self) {
        self.channels.clear();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionStatus, Measurement};
    use crate::smoothing::SmoothingConfig;
    use crate::timeseries::MergePath;

    fn context() -> SessionContext {
        SessionContext::new(SessionConfig::default()).unwrap()
    }

    fn measurements(points: &[(f64, f64)]) -> Batch {
        Batch::Measurements(
            points
                .iter()
                .map(|&(time, value)| Measurement::new(time, value))
                .collect(),
        )
    }

    fn detections(points: &[(f64, bool)]) -> Batch {
        Batch::Detections(
            points
                .iter()
                .map(|&(time, detected)| DetectionStatus::new(time, detected, true))
                .collect(),
        )
    }

    fn merged_pairs(context: &SessionContext, channel: Channel) -> Vec<(f64, f64)> {
        context.merged_buffer(channel).plot_points(usize::MAX)
    }

    #[test]
    fn merges_batches_per_channel() {
        let mut context = context();
        context
            .merge_batch(Channel::PulseTrace, measurements(&[(1.0, 10.0), (2.0, 20.0), (3.0, 30.0)]))
            .unwrap();
        let update = context
            .merge_batch(Channel::PulseTrace, measurements(&[(2.0, 99.0), (4.0, 40.0)]))
            .unwrap();
        context
            .merge_batch(Channel::BreathingUpperTrace, measurements(&[(1.0, 0.5)]))
            .unwrap();

        assert_eq!(update.outcome.path, MergePath::OverlapExtend);
        assert_eq!(
            merged_pairs(&context, Channel::PulseTrace),
            vec![(1.0, 10.0), (2.0, 99.0), (4.0, 40.0)]
        );
        assert_eq!(
            merged_pairs(&context, Channel::BreathingUpperTrace),
            vec![(1.0, 0.5)]
        );
        assert_eq!(
            context.channels().collect::<Vec<_>>(),
            vec![Channel::PulseTrace, Channel::BreathingUpperTrace]
        );
    }

    #[test]
    fn rejects_payload_of_the_wrong_kind() {
        let mut context = context();
        let err = context
            .merge_batch(Channel::Blinking, measurements(&[(1.0, 1.0)]))
            .unwrap_err();
        assert!(err.to_string().contains("face.blinking"));
        assert!(context.merged_buffer(Channel::Blinking).is_empty());
    }

    #[test]
    fn held_snapshot_is_not_affected_by_later_merges() {
        let mut context = context();
        context
            .merge_batch(Channel::PulseRate, measurements(&[(1.0, 60.0)]))
            .unwrap();
        let held = context.merged_buffer(Channel::PulseRate);

        context
            .merge_batch(Channel::PulseRate, measurements(&[(1.0, 61.0), (2.0, 62.0)]))
            .unwrap();

        assert_eq!(held.plot_points(10), vec![(1.0, 60.0)]);
        assert_eq!(context.latest_value(Channel::PulseRate), Some(62.0));
    }

    #[test]
    fn detection_channels_smooth_only_new_samples() {
        let mut config = SessionConfig::default();
        config.smoothing.blinking = SmoothingConfig {
            window_size: 3,
            true_threshold: 2,
            require_stable: false,
            hysteresis_time: 0.1,
        };
        let mut context = SessionContext::new(config).unwrap();

        let first = context
            .merge_batch(Channel::Blinking, detections(&[(0.0, false), (0.05, true)]))
            .unwrap();
        assert_eq!(first.smoothed_points, 2);

        // Re-sends 0.05 with a revised value and adds 0.08.
        let second = context
            .merge_batch(Channel::Blinking, detections(&[(0.05, true), (0.08, true)]))
            .unwrap();
        assert_eq!(second.smoothed_points, 1);

        let smoothed: Vec<(f64, bool)> = context
            .smoothed_buffer(Channel::Blinking)
            .iter()
            .map(|p| (p.time, p.state))
            .collect();
        assert_eq!(smoothed, vec![(0.0, false), (0.05, false), (0.08, true)]);
        assert_eq!(context.merged_buffer(Channel::Blinking).len(), 3);
        assert_eq!(context.latest_state(Channel::Blinking), Some(true));
    }

    #[test]
    fn continuous_channels_have_no_smoothed_series() {
        let mut context = context();
        let update = context
            .merge_batch(Channel::PulseTrace, measurements(&[(1.0, 1.0)]))
            .unwrap();
        assert_eq!(update.smoothed_points, 0);
        assert!(context.smoothed_buffer(Channel::PulseTrace).is_empty());
    }

    #[test]
    fn capacity_trims_oldest_samples() {
        let mut config = SessionConfig::default();
        config.max_samples_per_channel = Some(3);
        let mut context = SessionContext::new(config).unwrap();

        context
            .merge_batch(Channel::PulseTrace, measurements(&[(1.0, 1.0), (2.0, 2.0)]))
            .unwrap();
        let update = context
            .merge_batch(Channel::PulseTrace, measurements(&[(3.0, 3.0), (4.0, 4.0)]))
            .unwrap();
        assert_eq!(update.trimmed, 1);
        assert_eq!(
            context.merged_buffer(Channel::PulseTrace).times(),
            vec![2.0, 3.0, 4.0]
        );

        context
            .merge_batch(
                Channel::Talking,
                detections(&[(0.0, false), (0.1, false), (0.2, true), (0.3, true)]),
            )
            .unwrap();
        assert_eq!(context.merged_buffer(Channel::Talking).len(), 3);
        assert_eq!(context.smoothed_buffer(Channel::Talking).len(), 3);
    }

    #[test]
    fn reset_clears_buffers_and_smoothing_state() {
        let mut context = context();
        context
            .merge_batch(Channel::PulseRate, measurements(&[(1.0, 70.0)]))
            .unwrap();
        context
            .merge_batch(
                Channel::Blinking,
                detections(&[(0.0, true), (0.1, true), (0.2, true)]),
            )
            .unwrap();
        assert_eq!(context.latest_state(Channel::Blinking), Some(true));

        context.reset();

        for channel in Channel::ALL {
            assert!(context.merged_buffer(channel).is_empty());
            assert!(context.smoothed_buffer(channel).is_empty());
        }
        assert_eq!(context.generation(), 1);

        // A single weak vote after reset starts from false again.
        context
            .merge_batch(Channel::Blinking, detections(&[(5.0, false)]))
            .unwrap();
        assert_eq!(context.latest_state(Channel::Blinking), Some(false));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SessionConfig::default();
        config.smoothing.talking.true_threshold = 0;
        assert!(SessionContext::new(config).is_err());
    }
}
