use std::collections::VecDeque;

use crate::models::{DetectionStatus, SmoothedPoint};

use super::config::SmoothingConfig;

/// Streaming debouncer for one boolean detection channel.
///
/// State carries across calls: feeding a series in several chunks gives the same output as
/// feeding it at once. Each raw sample produces exactly one smoothed point.
#[derive(Debug, Clone)]
pub struct DetectionSmoother {
    config: SmoothingConfig,
    window: VecDeque<DetectionStatus>,
    current_state: bool,
    /// `None` until the first accepted flip; hysteresis only applies after one.
    last_state_change_time: Option<f64>,
}

impl DetectionSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_size + 1),
            config,
            current_state: false,
            last_state_change_time: None,
        }
    }

    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    pub fn current_state(&self) -> bool {
        self.current_state
    }

    pub fn last_state_change_time(&self) -> Option<f64> {
        self.last_state_change_time
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.current_state = false;
        self.last_state_change_time = None;
    }

    /// Feed one raw sample and get the smoothed state at its time.
    pub fn push(&mut self, sample: &DetectionStatus) -> SmoothedPoint {
        self.window.push_back(*sample);
        while self.window.len() > self.config.window_size {
            self.window.pop_front();
        }

        let require_stable = self.config.require_stable;
        let (voters, true_votes) = self
            .window
            .iter()
            .filter(|raw| !require_stable || raw.stable)
            .fold((0usize, 0usize), |(voters, votes), raw| {
                (voters + 1, votes + usize::from(raw.detected))
            });

        // No usable evidence: hold whatever we had.
        if voters == 0 {
            return SmoothedPoint::new(sample.time, self.current_state);
        }

        let needed = self.config.true_threshold.min(voters / 2 + 1);
        let target_state = true_votes >= needed;

        if target_state != self.current_state && self.hysteresis_elapsed(sample.time) {
            self.current_state = target_state;
            self.last_state_change_time = Some(sample.time);
        }

        SmoothedPoint::new(sample.time, self.current_state)
    }

    /// Feed a run of raw samples in order. Empty input yields empty output and leaves state alone.
    pub fn smooth(&mut self, samples: &[DetectionStatus]) -> Vec<SmoothedPoint> {
        samples.iter().map(|sample| self.push(sample)).collect()
    }

    fn hysteresis_elapsed(&self, time: f64) -> bool {
        self.last_state_change_time
            .map_or(true, |changed_at| time - changed_at >= self.config.hysteresis_time)
    }
}
