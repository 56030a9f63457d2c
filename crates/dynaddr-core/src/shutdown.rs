//! Cooperative shutdown signal
//!
//! One [`ShutdownTrigger`] fans out to any number of [`ShutdownSignal`]s.
//! The watcher checks its signal between ticks and the engine's consumer
//! checks it while waiting for the next address set.

use tokio::sync::watch;

/// Create a connected trigger/signal pair
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

/// Sending half; fires the shutdown
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown of everything observing this trigger
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Hand out another signal connected to this trigger
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving half; cheap to clone
///
/// Dropping the trigger counts as a shutdown request.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has already been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once shutdown is requested
    ///
    /// Cancel-safe, so it can sit in a `tokio::select!` loop.
    pub async fn recv(&mut self) {
        // An error means the trigger is gone
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
