//! Single-slot latest-value mailbox
//!
//! The watcher publishes every detected address set here and the engine's
//! consumer loop waits on it. At most one value is held at a time; a publish
//! overwrites anything the consumer has not picked up yet, so intermediate
//! sets are never seen by the consumer.

use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;

/// Debounce mailbox holding at most one pending value
#[derive(Debug)]
pub struct Notifier<T> {
    slot: Mutex<Option<T>>,
    ready: Notify,
}

impl<T> Notifier<T> {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Notify::new(),
        }
    }

    /// Store `value`, dropping any unread predecessor
    ///
    /// Never blocks the caller.
    pub fn publish(&self, value: T) {
        let replaced = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(value)
            .is_some();
        if replaced {
            tracing::debug!("Unread notification overwritten by a newer one");
        }
        // Stores a permit when nobody is waiting yet
        self.ready.notify_one();
    }

    /// Take the pending value without waiting
    pub fn try_take(&self) -> Option<T> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Wait until a value is available, then take it
    ///
    /// Cancel-safe: dropping the future before it resolves leaves any
    /// pending value in the slot.
    pub async fn wait(&self) -> T {
        loop {
            let notified = self.ready.notified();
            if let Some(value) = self.try_take() {
                return value;
            }
            notified.await;
        }
    }

    /// Whether a value is waiting to be consumed
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}
