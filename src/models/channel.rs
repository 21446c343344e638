use serde::{Deserialize, Serialize};

use super::sample::{DetectionStatus, Measurement};

/// Payload shape carried by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelKind {
    Continuous,
    Detection,
}

/// One signal stream produced by the vitals engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    PulseRate,
    PulseTrace,
    BreathingRate,
    BreathingUpperTrace,
    BreathingLowerTrace,
    BreathingAmplitude,
    BreathingBaseline,
    RespiratoryLineLength,
    InhaleExhaleRatio,
    BloodPressurePhasic,
    Apnea,
    Blinking,
    Talking,
}

impl Channel {
    pub const ALL: [Channel; 13] = [
        Channel::PulseRate,
        Channel::PulseTrace,
        Channel::BreathingRate,
        Channel::BreathingUpperTrace,
        Channel::BreathingLowerTrace,
        Channel::BreathingAmplitude,
        Channel::BreathingBaseline,
        Channel::RespiratoryLineLength,
        Channel::InhaleExhaleRatio,
        Channel::BloodPressurePhasic,
        Channel::Apnea,
        Channel::Blinking,
        Channel::Talking,
    ];

    pub fn kind(&self) -> ChannelKind {
        match self {
            Channel::Apnea | Channel::Blinking | Channel::Talking => ChannelKind::Detection,
            _ => ChannelKind::Continuous,
        }
    }

    pub fn is_detection(&self) -> bool {
        self.kind() == ChannelKind::Detection
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::PulseRate => "pulse.rate",
            Channel::PulseTrace => "pulse.trace",
            Channel::BreathingRate => "breathing.rate",
            Channel::BreathingUpperTrace => "breathing.upperTrace",
            Channel::BreathingLowerTrace => "breathing.lowerTrace",
            Channel::BreathingAmplitude => "breathing.amplitude",
            Channel::BreathingBaseline => "breathing.baseline",
            Channel::RespiratoryLineLength => "breathing.respiratoryLineLength",
            Channel::InhaleExhaleRatio => "breathing.inhaleExhaleRatio",
            Channel::BloodPressurePhasic => "bloodPressure.phasic",
            Channel::Apnea => "breathing.apnea",
            Channel::Blinking => "face.blinking",
            Channel::Talking => "face.talking",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One delivery of new samples for a channel. Samples must be sorted ascending by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "samples")]
pub enum Batch {
    Measurements(Vec<Measurement>),
    Detections(Vec<DetectionStatus>),
}

impl Batch {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Batch::Measurements(_) => ChannelKind::Continuous,
            Batch::Detections(_) => ChannelKind::Detection,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batch::Measurements(samples) => samples.len(),
            Batch::Detections(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A batch addressed to its channel, as queued for the ingest loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelBatch {
    pub channel: Channel,
    pub batch: Batch,
}

impl ChannelBatch {
    pub fn measurements(channel: Channel, samples: Vec<Measurement>) -> Self {
        Self {
            channel,
            batch: Batch::Measurements(samples),
        }
    }

    pub fn detections(channel: Channel, samples: Vec<DetectionStatus>) -> Self {
        Self {
            channel,
            batch: Batch::Detections(samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_channels_are_face_and_apnea() {
        let detection: Vec<Channel> = Channel::ALL
            .iter()
            .copied()
            .filter(Channel::is_detection)
            .collect();
        assert_eq!(
            detection,
            vec![Channel::Apnea, Channel::Blinking, Channel::Talking]
        );
    }

    #[test]
    fn channel_names_are_unique() {
        let mut names: Vec<&str> = Channel::ALL.iter().map(Channel::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Channel::ALL.len());
    }

    #[test]
    fn batch_reports_its_kind() {
        let batch = ChannelBatch::detections(
            Channel::Blinking,
            vec![DetectionStatus::new(0.0, true, true)],
        );
        assert_eq!(batch.batch.kind(), ChannelKind::Detection);
        assert_eq!(batch.batch.len(), 1);
        assert!(Batch::Measurements(Vec::new()).is_empty());
    }
}
