pub mod channel;
pub mod metrics_buffer;
pub mod sample;
pub mod session;

pub use channel::{Batch, Channel, ChannelBatch, ChannelKind};
pub use metrics_buffer::MetricsBuffer;
pub use sample::{DetectionStatus, Measurement, SmoothedPoint, TimeStamped};
pub use session::{SessionInfo, SessionStatus};
