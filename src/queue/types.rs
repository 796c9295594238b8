use crate::resolver::{DurationSource, ResolutionStep, ResolvedDuration};
use serde::Serialize;

pub type ItemId = u64;

/// Lifecycle: Pending -> Processing -> Completed | Error.
/// Error items may be requeued; Completed items never run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// One media item tracked by the batch queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub name: String,
    /// Path or URL handed to the source provider.
    pub location: String,
    pub size: u64,
    pub status: ItemStatus,
    /// Label of the tier currently running.
    pub step: Option<String>,
    /// Seconds; 0 until the item completes.
    pub duration: f64,
    pub source: Option<DurationSource>,
    pub error: Option<String>,
}

impl QueueItem {
    pub fn is_runnable(&self) -> bool {
        matches!(self.status, ItemStatus::Pending | ItemStatus::Error)
    }
}

/// Notifications for read-only observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueueEvent {
    Added { id: ItemId },
    Processing { id: ItemId },
    Step { id: ItemId, step: ResolutionStep },
    Completed { id: ItemId, result: ResolvedDuration },
    Failed { id: ItemId, error: String },
    Requeued { id: ItemId },
    Removed { id: ItemId },
}
