pub mod context;
pub mod controller;
mod loop_worker;
pub mod observer;
pub mod sender;
pub mod snapshot;
pub mod store;

pub use context::{ChannelUpdate, SessionContext};
pub use controller::SessionController;
pub use observer::{ObserverRegistry, SessionObserver, UpdateLog};
pub use sender::BatchSender;
pub use snapshot::{ChannelSnapshot, SeriesSnapshot};
pub use store::SnapshotStore;
