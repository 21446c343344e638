use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use log::info;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::models::{Channel, SessionInfo, SessionStatus, SmoothedPoint};
use crate::settings::{SessionConfig, SettingsStore};

use super::context::SessionContext;
use super::loop_worker::{ingest_loop, IngestWorker};
use super::observer::{ObserverRegistry, SessionObserver};
use super::sender::BatchSender;
use super::snapshot::{ChannelSnapshot, SeriesSnapshot};
use super::store::SnapshotStore;

const ENABLE_LOGS: bool = true;

use crate::log_error;

struct ActiveSession {
    info: SessionInfo,
    sender: BatchSender,
    handle: JoinHandle<u64>,
    cancel_token: CancellationToken,
    drain_tx: watch::Sender<bool>,
}

/// Runs measurement sessions: one ingest task per session, fed through a bounded queue.
///
/// Must be used from inside a tokio runtime.
pub struct SessionController {
    config: SessionConfig,
    store: SnapshotStore,
    observers: ObserverRegistry,
    metrics: MetricsCollector,
    active: Option<ActiveSession>,
    last_session: Option<SessionInfo>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: SnapshotStore::new(),
            observers: ObserverRegistry::new(),
            metrics: MetricsCollector::new(),
            active: None,
            last_session: None,
        })
    }

    pub fn from_settings(settings: &SettingsStore) -> Result<Self> {
        Self::new(settings.session_config())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Takes effect from the next session.
    pub fn set_config(&mut self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Reader handle that outlives sessions; clone it into UI or telemetry code.
    pub fn store(&self) -> SnapshotStore {
        self.store.clone()
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot().await
    }

    pub fn register_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.register(observer);
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_session(&self) -> Option<SessionInfo> {
        self.active.as_ref().map(|active| active.info.clone())
    }

    pub fn last_session(&self) -> Option<SessionInfo> {
        self.last_session.clone()
    }

    /// Sender for the running session, if any.
    pub fn sender(&self) -> Option<BatchSender> {
        self.active.as_ref().map(|active| active.sender.clone())
    }

    /// Start a session with empty buffers and fresh smoothing state.
    pub fn start_session(&mut self) -> Result<(SessionInfo, BatchSender)> {
        if self.active.is_some() {
            bail!("session already active");
        }

        let generation = self.store.begin_generation();
        self.observers.notify_reset(generation);
        let context = SessionContext::with_generation(self.config.clone(), generation)?;

        let (batch_tx, batch_rx) = mpsc::channel(self.config.queue_capacity);
        let (drain_tx, drain_rx) = watch::channel(false);
        let cancel_token = CancellationToken::new();

        let worker = IngestWorker {
            context,
            store: self.store.clone(),
            observers: self.observers.clone(),
            metrics: self.metrics.clone(),
        };
        let handle = tokio::spawn(ingest_loop(
            worker,
            batch_rx,
            drain_rx,
            cancel_token.clone(),
        ));

        let info = SessionInfo {
            id: Uuid::new_v4().to_string(),
            generation,
            started_at: Utc::now(),
            stopped_at: None,
            status: SessionStatus::Running,
            batches_applied: 0,
        };
        let sender = BatchSender::new(batch_tx);

        info!("Started session {} (generation {})", info.id, generation);

        self.active = Some(ActiveSession {
            info: info.clone(),
            sender: sender.clone(),
            handle,
            cancel_token,
            drain_tx,
        });
        Ok((info, sender))
    }

    /// Stop intake, apply whatever is still queued, then finish. Buffers stay readable.
    pub async fn stop_session(&mut self) -> Result<SessionInfo> {
        let active = self
            .active
            .take()
            .ok_or_else(|| anyhow!("no active session to stop"))?;

        let _ = active.drain_tx.send(true);
        let batches_applied = match active.handle.await {
            Ok(count) => count,
            Err(err) => {
                log_error!("ingest loop for session {} failed: {err}", active.info.id);
                self.last_session = Some(SessionInfo {
                    stopped_at: Some(Utc::now()),
                    status: SessionStatus::Cancelled,
                    ..active.info
                });
                return Err(err).context("ingest loop task failed to join");
            }
        };

        let info = SessionInfo {
            stopped_at: Some(Utc::now()),
            status: SessionStatus::Completed,
            batches_applied,
            ..active.info
        };
        info!(
            "Completed session {} with {} batches",
            info.id, info.batches_applied
        );
        self.last_session = Some(info.clone());
        Ok(info)
    }

    /// Cancel any running session and discard all buffers, smoothing state and metrics.
    pub async fn reset_session(&mut self) -> Result<()> {
        if let Some(active) = self.active.take() {
            active.cancel_token.cancel();
            let batches_applied = match active.handle.await {
                Ok(count) => count,
                Err(err) => {
                    log_error!("ingest loop for session {} failed: {err}", active.info.id);
                    0
                }
            };
            let info = SessionInfo {
                stopped_at: Some(Utc::now()),
                status: SessionStatus::Cancelled,
                batches_applied,
                ..active.info
            };
            info!("Cancelled session {}", info.id);
            self.last_session = Some(info);
        }

        let generation = self.store.begin_generation();
        self.metrics.reset().await;
        self.observers.notify_reset(generation);
        Ok(())
    }

    /// Reset, then start again with the current config.
    pub async fn restart_session(&mut self) -> Result<(SessionInfo, BatchSender)> {
        self.reset_session().await?;
        self.start_session()
    }

    pub fn snapshot(&self, channel: Channel) -> ChannelSnapshot {
        self.store.snapshot(channel)
    }

    pub fn merged_buffer(&self, channel: Channel) -> SeriesSnapshot {
        self.store.merged_buffer(channel)
    }

    pub fn smoothed_buffer(&self, channel: Channel) -> Arc<Vec<SmoothedPoint>> {
        self.store.smoothed_buffer(channel)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel_token.cancel();
        }
    }
}
