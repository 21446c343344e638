//! Streaming core for camera-based vitals.
//!
//! The vitals engine hands over short, overlapping batches of samples per channel. Each batch is
//! merged into that channel's sorted buffer, and boolean channels (blinking, talking, apnea) also
//! run through a windowed-majority smoother with hysteresis. A [`SessionController`] owns the
//! ingest task; readers use the [`SnapshotStore`] it hands out.

pub mod metrics;
pub mod models;
pub mod session;
pub mod settings;
pub mod smoothing;
pub mod timeseries;
pub mod utils;

pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use models::{
    Batch, Channel, ChannelBatch, ChannelKind, DetectionStatus, Measurement, MetricsBuffer,
    SessionInfo, SessionStatus, SmoothedPoint, TimeStamped,
};
pub use session::{
    BatchSender, ChannelSnapshot, SeriesSnapshot, SessionContext, SessionController,
    SessionObserver, SnapshotStore,
};
pub use settings::{SessionConfig, SettingsStore, SmoothingSettings};
pub use smoothing::{DetectionSmoother, SmoothingConfig};
pub use timeseries::{merge_sorted, MergeOutcome, MergePath};

/// Install the `env_logger` backend, honouring `RUST_LOG` on top of an `info` default.
///
/// Host apps that bring their own `log` backend can skip this. Calling it twice is harmless.
pub fn init_logging() {
    let installed = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .is_ok();

    if installed {
        log::info!("vitals-stream {} logging ready", env!("CARGO_PKG_VERSION"));
    }
}
