use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Single-assignment outcome shared by racing tasks.
///
/// The first `settle` wins and wakes the receiver; later calls are no-ops and
/// report `false` so the loser can discard its result.
pub struct SettleSlot<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> SettleSlot<T> {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (sender, receiver) = oneshot::channel();
        let slot = Arc::new(Self {
            sender: Mutex::new(Some(sender)),
        });
        (slot, receiver)
    }

    pub fn settle(&self, value: T) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            // A dropped receiver still counts as settled by us.
            Some(sender) => {
                let _ = sender.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}
