mod controller;
mod provider;
mod stats;
mod types;

pub use controller::BatchQueue;
pub use provider::{LocationProvider, MediaSourceProvider};
pub use stats::QueueStats;
pub use types::{ItemId, ItemStatus, QueueEvent, QueueItem};
