use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Tunables for the windowed-majority + hysteresis detection smoother.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothingConfig {
    /// Number of most recent raw samples that vote
    pub window_size: usize,

    /// Votes needed for "detected", capped at a simple majority of the voters
    pub true_threshold: usize,

    /// Only samples the engine marked stable get a vote
    pub require_stable: bool,

    /// Seconds that must pass after a flip before the next one is accepted
    pub hysteresis_time: f64,
}

impl SmoothingConfig {
    /// Eye blinks are short, so the window is small and reacts fast.
    pub fn blinking() -> Self {
        Self {
            window_size: 5,
            true_threshold: 3,
            require_stable: false,
            hysteresis_time: 0.1,
        }
    }

    pub fn talking() -> Self {
        Self {
            window_size: 7,
            true_threshold: 4,
            require_stable: false,
            hysteresis_time: 0.15,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            bail!("smoothing window_size must be at least 1");
        }
        if self.true_threshold == 0 {
            bail!("smoothing true_threshold must be at least 1");
        }
        if self.hysteresis_time.is_nan() || self.hysteresis_time < 0.0 {
            bail!(
                "smoothing hysteresis_time must be a non-negative number of seconds, got {}",
                self.hysteresis_time
            );
        }
        Ok(())
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self::blinking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        SmoothingConfig::blinking().validate().unwrap();
        SmoothingConfig::talking().validate().unwrap();
    }

    #[test]
    fn rejects_degenerate_values() {
        let mut config = SmoothingConfig::default();
        config.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = SmoothingConfig::default();
        config.true_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = SmoothingConfig::default();
        config.hysteresis_time = -0.5;
        assert!(config.validate().is_err());

        config.hysteresis_time = f64::NAN;
        assert!(config.validate().is_err());
    }
}
