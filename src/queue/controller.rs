use super::provider::{LocationProvider, MediaSourceProvider};
use super::stats::QueueStats;
use super::types::{ItemId, ItemStatus, QueueEvent, QueueItem};
use crate::config::QueueConfig;
use crate::errors::{MediaResult, QueueError};
use crate::resolver::{DurationResolver, ResolutionStep, ResolvedDuration};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;

const EVENT_CAPACITY: usize = 256;

/// Ordered collection of media items and the commands that move them
/// through resolution.
///
/// Readers get immutable snapshots; every command swaps in a new `Vec`, so a
/// snapshot taken earlier never changes under its holder. An id is resolved
/// by at most one task at a time.
pub struct BatchQueue {
    items: Mutex<Arc<Vec<QueueItem>>>,
    in_flight: Mutex<HashSet<ItemId>>,
    next_id: AtomicU64,
    resolver: Arc<DurationResolver>,
    provider: Arc<dyn MediaSourceProvider>,
    events: broadcast::Sender<QueueEvent>,
    max_parallel: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn unknown(id: ItemId) -> QueueError {
    QueueError::new(format!("no queue item with id {}", id))
}

impl BatchQueue {
    pub fn new(resolver: Arc<DurationResolver>, config: &QueueConfig) -> Self {
        Self::with_provider(resolver, Arc::new(LocationProvider), config)
    }

    pub fn with_provider(
        resolver: Arc<DurationResolver>,
        provider: Arc<dyn MediaSourceProvider>,
        config: &QueueConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: Mutex::new(Arc::new(Vec::new())),
            in_flight: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
            resolver,
            provider,
            events,
            max_parallel: config.max_parallel.max(1),
        }
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Vec<QueueItem>> {
        lock(&self.items).clone()
    }

    pub fn get(&self, id: ItemId) -> Option<QueueItem> {
        self.snapshot().iter().find(|item| item.id == id).cloned()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::from_items(&self.snapshot())
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Apply `change` to a copy of the item list and publish the copy.
    fn update<R>(
        &self,
        id: ItemId,
        change: impl FnOnce(&mut QueueItem) -> R,
    ) -> Result<R, QueueError> {
        let mut items = lock(&self.items);
        let mut next = items.as_ref().clone();
        let item = next
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| unknown(id))?;
        let result = change(item);
        *items = Arc::new(next);
        Ok(result)
    }

    pub fn enqueue(&self, name: impl Into<String>, location: impl Into<String>, size: u64) -> ItemId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let item = QueueItem {
            id,
            name: name.into(),
            location: location.into(),
            size,
            status: ItemStatus::Pending,
            step: None,
            duration: 0.0,
            source: None,
            error: None,
        };
        debug!("enqueued {} as #{}", item.location, id);
        {
            let mut items = lock(&self.items);
            let mut next = items.as_ref().clone();
            next.push(item);
            *items = Arc::new(next);
        }
        self.emit(QueueEvent::Added { id });
        id
    }

    /// Claim `id` for resolution. Returns false without changing anything
    /// when the item is already in flight or already completed.
    pub fn mark_processing(&self, id: ItemId) -> Result<bool, QueueError> {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.contains(&id) {
            debug!("#{} is already being resolved", id);
            return Ok(false);
        }

        let claimed = self.update(id, |item| {
            if item.status == ItemStatus::Completed {
                return false;
            }
            item.status = ItemStatus::Processing;
            item.step = None;
            item.error = None;
            true
        })?;
        if claimed {
            in_flight.insert(id);
            drop(in_flight);
            self.emit(QueueEvent::Processing { id });
        }
        Ok(claimed)
    }

    pub fn set_step(&self, id: ItemId, step: ResolutionStep) -> Result<(), QueueError> {
        self.update(id, |item| item.step = Some(step.label().to_string()))?;
        self.emit(QueueEvent::Step { id, step });
        Ok(())
    }

    /// Record the outcome of a resolution and release the claim on `id`.
    pub fn mark_result(
        &self,
        id: ItemId,
        result: MediaResult<ResolvedDuration>,
    ) -> Result<(), QueueError> {
        lock(&self.in_flight).remove(&id);

        match result {
            Ok(resolved) => {
                self.update(id, |item| {
                    item.status = ItemStatus::Completed;
                    item.step = None;
                    item.duration = resolved.seconds;
                    item.source = Some(resolved.source);
                    item.error = None;
                })?;
                self.emit(QueueEvent::Completed {
                    id,
                    result: resolved,
                });
            }
            Err(e) => {
                let error = e.to_string();
                self.update(id, |item| {
                    item.status = ItemStatus::Error;
                    item.step = None;
                    item.duration = 0.0;
                    item.source = None;
                    item.error = Some(error.clone());
                })?;
                self.emit(QueueEvent::Failed { id, error });
            }
        }
        Ok(())
    }

    /// Move an errored item back to pending.
    pub fn requeue(&self, id: ItemId) -> Result<(), QueueError> {
        let previous = self.update(id, |item| {
            let previous = item.status;
            if previous == ItemStatus::Error {
                item.status = ItemStatus::Pending;
                item.error = None;
            }
            previous
        })?;
        if previous != ItemStatus::Error {
            return Err(QueueError::new(format!(
                "#{} is {:?} and cannot be requeued",
                id, previous
            )));
        }
        self.emit(QueueEvent::Requeued { id });
        Ok(())
    }

    /// Drop an item. A resolution still running for it finishes, but its
    /// result is discarded.
    pub fn remove(&self, id: ItemId) -> Result<QueueItem, QueueError> {
        let removed = {
            let mut items = lock(&self.items);
            let position = items
                .iter()
                .position(|item| item.id == id)
                .ok_or_else(|| unknown(id))?;
            let mut next = items.as_ref().clone();
            let removed = next.remove(position);
            *items = Arc::new(next);
            removed
        };
        self.emit(QueueEvent::Removed { id });
        Ok(removed)
    }

    /// Resolve one item. Returns false when the item could not be claimed.
    pub async fn process(&self, id: ItemId) -> Result<bool, QueueError> {
        if !self.mark_processing(id)? {
            return Ok(false);
        }
        let item = match self.get(id) {
            Some(item) => item,
            None => {
                lock(&self.in_flight).remove(&id);
                return Err(unknown(id));
            }
        };

        let result = match self.provider.open(&item).await {
            Ok(source) => {
                let on_step = |step: ResolutionStep| {
                    if let Err(e) = self.set_step(id, step) {
                        debug!("step for #{} dropped: {}", id, e);
                    }
                };
                self.resolver.resolve(source, &on_step).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(resolved) => info!(
                "{}: {:.3}s ({})",
                item.name,
                resolved.seconds,
                resolved.source.name()
            ),
            Err(e) => warn!("{}: {}", item.name, e),
        }

        if let Err(e) = self.mark_result(id, result) {
            debug!("result for #{} discarded: {}", id, e);
        }
        Ok(true)
    }

    /// Resolve every pending or errored item, at most `max_parallel` at a
    /// time, in queue order. Returns the aggregates once all have settled.
    pub async fn process_all(self: &Arc<Self>) -> QueueStats {
        let ids: Vec<ItemId> = self
            .snapshot()
            .iter()
            .filter(|item| item.is_runnable())
            .map(|item| item.id)
            .collect();
        debug!("processing {} items, {} at a time", ids.len(), self.max_parallel);

        let limit = Arc::new(Semaphore::new(self.max_parallel));
        let mut workers = JoinSet::new();
        for id in ids {
            let permit = match limit.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let queue = self.clone();
            workers.spawn(async move {
                let _permit = permit;
                if let Err(e) = queue.process(id).await {
                    debug!("skipping #{}: {}", id, e);
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("queue worker failed: {}", e);
            }
        }
        self.stats()
    }
}
