use serde::{Deserialize, Serialize};

/// Anything carrying a time offset (seconds since measurement start) that orders it in a series.
pub trait TimeStamped {
    fn time(&self) -> f64;
}

/// One observation of a continuous channel (traces, rates, amplitudes).
///
/// `stable` is true unless the engine says otherwise, both from [`Measurement::new`] and when
/// the field is missing from a payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub time: f64,
    pub value: f64,
    #[serde(default = "stable_by_default")]
    pub stable: bool,
    /// Only reported for rate channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

fn stable_by_default() -> bool {
    true
}

impl Measurement {
    pub fn new(time: f64, value: f64) -> Self {
        Self {
            time,
            value,
            stable: true,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn unstable(mut self) -> Self {
        self.stable = false;
        self
    }
}

impl TimeStamped for Measurement {
    fn time(&self) -> f64 {
        self.time
    }
}

/// One raw observation of a boolean detection channel (blinking, talking, apnea).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStatus {
    pub time: f64,
    pub detected: bool,
    #[serde(default)]
    pub stable: bool,
}

impl DetectionStatus {
    pub fn new(time: f64, detected: bool, stable: bool) -> Self {
        Self {
            time,
            detected,
            stable,
        }
    }

    /// Value used when the raw series is drawn next to the smoothed one.
    pub fn plot_value(&self) -> f64 {
        if self.detected {
            1.0
        } else {
            0.0
        }
    }
}

impl TimeStamped for DetectionStatus {
    fn time(&self) -> f64 {
        self.time
    }
}

/// One point of a debounced detection series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothedPoint {
    pub time: f64,
    pub state: bool,
}

impl SmoothedPoint {
    pub fn new(time: f64, state: bool) -> Self {
        Self { time, state }
    }

    pub fn plot_value(&self) -> f64 {
        if self.state {
            1.0
        } else {
            0.0
        }
    }
}

impl TimeStamped for SmoothedPoint {
    fn time(&self) -> f64 {
        self.time
    }
}
