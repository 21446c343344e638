use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::channel::{Channel, ChannelBatch};
use super::sample::{DetectionStatus, Measurement};

/// Decoded form of the metrics payload the vitals engine publishes on every processed chunk.
///
/// Every series is optional on the wire; missing series decode as empty and are skipped by
/// [`MetricsBuffer::into_batches`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsBuffer {
    pub pulse: PulseMetrics,
    pub breathing: BreathingMetrics,
    pub face: FaceMetrics,
    pub blood_pressure: BloodPressureMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PulseMetrics {
    pub rate: Vec<Measurement>,
    pub trace: Vec<Measurement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreathingMetrics {
    pub rate: Vec<Measurement>,
    pub upper_trace: Vec<Measurement>,
    pub lower_trace: Vec<Measurement>,
    pub amplitude: Vec<Measurement>,
    pub apnea: Vec<DetectionStatus>,
    pub respiratory_line_length: Vec<Measurement>,
    pub inhale_exhale_ratio: Vec<Measurement>,
    pub baseline: Vec<Measurement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaceMetrics {
    pub blinking: Vec<DetectionStatus>,
    pub talking: Vec<DetectionStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BloodPressureMetrics {
    pub phasic: Vec<Measurement>,
}

impl MetricsBuffer {
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).context("failed to decode metrics buffer payload")
    }

    /// Split into one batch per non-empty series.
    pub fn into_batches(self) -> Vec<ChannelBatch> {
        let MetricsBuffer {
            pulse,
            breathing,
            face,
            blood_pressure,
        } = self;

        let measurements = [
            (Channel::PulseRate, pulse.rate),
            (Channel::PulseTrace, pulse.trace),
            (Channel::BreathingRate, breathing.rate),
            (Channel::BreathingUpperTrace, breathing.upper_trace),
            (Channel::BreathingLowerTrace, breathing.lower_trace),
            (Channel::BreathingAmplitude, breathing.amplitude),
            (Channel::BreathingBaseline, breathing.baseline),
            (Channel::RespiratoryLineLength, breathing.respiratory_line_length),
            (Channel::InhaleExhaleRatio, breathing.inhale_exhale_ratio),
            (Channel::BloodPressurePhasic, blood_pressure.phasic),
        ];
        let detections = [
            (Channel::Apnea, breathing.apnea),
            (Channel::Blinking, face.blinking),
            (Channel::Talking, face.talking),
        ];

        let mut batches: Vec<ChannelBatch> = measurements
            .into_iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(channel, samples)| ChannelBatch::measurements(channel, samples))
            .collect();
        batches.extend(
            detections
                .into_iter()
                .filter(|(_, samples)| !samples.is_empty())
                .map(|(channel, samples)| ChannelBatch::detections(channel, samples)),
        );
        batches
    }
}
