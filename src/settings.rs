use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::models::Channel;
use crate::smoothing::SmoothingConfig;

const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmoothingSettings {
    pub blinking: SmoothingConfig,
    pub talking: SmoothingConfig,
    pub apnea: SmoothingConfig,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            blinking: SmoothingConfig::blinking(),
            talking: SmoothingConfig::talking(),
            apnea: SmoothingConfig::default(),
        }
    }
}

impl SmoothingSettings {
    /// Smoother tuning for a detection channel; `None` for continuous channels.
    pub fn for_channel(&self, channel: Channel) -> Option<SmoothingConfig> {
        match channel {
            Channel::Blinking => Some(self.blinking),
            Channel::Talking => Some(self.talking),
            Channel::Apnea => Some(self.apnea),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Batches the engine may queue ahead of the ingest loop before senders wait.
    pub queue_capacity: usize,
    /// Oldest samples beyond this are dropped after each merge. `None` keeps the whole session.
    pub max_samples_per_channel: Option<usize>,
    pub smoothing: SmoothingSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_samples_per_channel: None,
            smoothing: SmoothingSettings::default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be at least 1");
        }
        if self.max_samples_per_channel == Some(0) {
            anyhow::bail!("max_samples_per_channel must be at least 1 when set");
        }
        let SmoothingSettings {
            blinking,
            talking,
            apnea,
        } = &self.smoothing;
        blinking.validate().context("invalid blinking smoothing")?;
        talking.validate().context("invalid talking smoothing")?;
        apnea.validate().context("invalid apnea smoothing")?;
        Ok(())
    }
}

/// Session configuration persisted as JSON next to the host app's data.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<SessionConfig>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<SessionConfig>(&contents) {
                Ok(config) if config.validate().is_ok() => config,
                _ => {
                    warn!(
                        "Ignoring unusable settings in {}; using defaults",
                        path.display()
                    );
                    SessionConfig::default()
                }
            }
        } else {
            SessionConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        self.read().clone()
    }

    pub fn update(&self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        let mut guard = self.write();
        self.persist(&config)?;
        *guard = config;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: SessionConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", self.path.display()))?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &SessionConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionConfig> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionConfig> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
