use super::types::{ItemStatus, QueueItem};
use serde::Serialize;

/// Aggregates over one snapshot. Only completed items contribute durations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub errored: usize,
    pub sum_seconds: f64,
    pub average_seconds: Option<f64>,
    pub max_seconds: Option<f64>,
    pub min_seconds: Option<f64>,
}

impl QueueStats {
    pub fn from_items(items: &[QueueItem]) -> Self {
        let mut stats = QueueStats {
            total: items.len(),
            ..QueueStats::default()
        };

        for item in items {
            match item.status {
                ItemStatus::Pending => stats.pending += 1,
                ItemStatus::Processing => stats.processing += 1,
                ItemStatus::Error => stats.errored += 1,
                ItemStatus::Completed => {
                    stats.completed += 1;
                    stats.sum_seconds += item.duration;
                    stats.max_seconds = Some(stats.max_seconds.map_or(item.duration, |m| m.max(item.duration)));
                    stats.min_seconds = Some(stats.min_seconds.map_or(item.duration, |m| m.min(item.duration)));
                }
            }
        }

        if stats.completed > 0 {
            stats.average_seconds = Some(stats.sum_seconds / stats.completed as f64);
        }
        stats
    }
}
