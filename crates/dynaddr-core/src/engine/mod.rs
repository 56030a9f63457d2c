//! Core dynaddr engine
//!
//! The DynAddrEngine is responsible for:
//! - Running the DNS record watcher on its poll interval
//! - Waiting for published address sets
//! - Reconciling the interface with each set, retrying within limits
//! - Reporting fatal reconciliation failures to the caller
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  publish   ┌──────────┐   wait   ┌──────────────┐
//! │ DnsRecordWatcher │──────────▶ │ Notifier │ ───────▶ │  consumer    │
//! │ (ticks, gate)    │            │ (1 slot) │          │  loop        │
//! └──────────────────┘            └──────────┘          └──────────────┘
//!          │                                                   │
//!          ▼                                                   ▼
//!   ┌─────────────┐                                     ┌──────────────┐
//!   │  Resolver   │                                     │  Reconciler  │
//!   └─────────────┘                                     └──────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. A tick resolves the hostname and publishes a changed set
//! 2. The consumer takes the newest set from the mailbox
//! 3. The reconciler replaces the primary address, adds the rest, sets the link up
//! 4. Failures are retried; once retries run out the engine stops with the error

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::DynAddrConfig;
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::shutdown::{self, ShutdownSignal};
use crate::traits::{LinkControl, Resolver};
use crate::watcher::DnsRecordWatcher;

/// Events emitted by the DynAddrEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        hostname: String,
        device: String,
    },

    /// A changed address set reached the consumer
    AddressesChanged {
        addrs: Vec<String>,
    },

    /// Interface reconciled
    ReloadSucceeded {
        device: String,
        addrs: Vec<String>,
    },

    /// A reconciliation attempt failed
    ReloadFailed {
        device: String,
        error: String,
        attempt: usize,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Core dynaddr engine
///
/// ## Lifecycle
///
/// 1. Create with [`DynAddrEngine::new()`]
/// 2. Start with [`DynAddrEngine::run_with_shutdown()`]
/// 3. Engine runs until the shutdown signal fires or reconciliation fails fatally
///
/// ## Shutdown
///
/// A shutdown lets an in-progress reload finish, interrupts a retry delay,
/// and aborts any in-flight lookup.
pub struct DynAddrEngine {
    /// Watcher feeding the mailbox
    watcher: Arc<DnsRecordWatcher>,

    /// Reconciler applying address sets
    reconciler: Reconciler,

    /// Retries after the first failed reload
    max_reload_retries: usize,

    /// Delay between reload attempts
    retry_delay: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DynAddrEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `resolver`: Resolver used by the watcher
    /// - `link`: Backend the reconciler mutates
    /// - `config`: dynaddr configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn Resolver>,
        link: Box<dyn LinkControl>,
        config: DynAddrConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let watcher =
            DnsRecordWatcher::new(resolver, config.hostname.clone(), config.poll_interval())?;

        let engine = Self {
            watcher: Arc::new(watcher),
            reconciler: Reconciler::new(link, config.device.clone()),
            max_reload_retries: config.engine.max_reload_retries,
            retry_delay: config.engine.retry_delay(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The watcher driving this engine
    pub fn watcher(&self) -> &Arc<DnsRecordWatcher> {
        &self.watcher
    }

    /// Run the engine until `shutdown` fires
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Reconciliation failed and retries were exhausted
    pub async fn run_with_shutdown(&self, shutdown: ShutdownSignal) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            hostname: self.watcher.hostname().to_string(),
            device: self.reconciler.device().to_string(),
        });
        info!(
            "Engine started: {} -> {}",
            self.watcher.hostname(),
            self.reconciler.device()
        );

        // The watcher stops as soon as the consumer does, for whatever reason
        let (stop_watcher, watcher_signal) = shutdown::channel();
        let watching = Arc::clone(&self.watcher).run(watcher_signal);
        let consuming = async {
            let result = self.consume(shutdown).await;
            stop_watcher.trigger();
            result
        };

        let ((), result) = tokio::join!(watching, consuming);

        let reason = match &result {
            Ok(()) => "Shutdown signal".to_string(),
            Err(e) => format!("Fatal error: {}", e),
        };
        info!("Engine stopped: {}", reason);
        self.emit_event(EngineEvent::Stopped { reason });

        result
    }

    /// Consumer loop: wait for a set, reconcile, repeat
    async fn consume(&self, mut shutdown: ShutdownSignal) -> Result<()> {
        loop {
            if shutdown.is_triggered() {
                info!("Shutdown signal received");
                return Ok(());
            }

            let addrs = tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
                addrs = self.watcher.wait_for_change() => addrs,
            };

            debug!("Received address set {:?}", addrs);
            self.emit_event(EngineEvent::AddressesChanged {
                addrs: addrs.clone(),
            });

            self.reload_with_retry(addrs, &mut shutdown).await?;
        }
    }

    /// Reload the interface, retrying up to `max_reload_retries` times
    ///
    /// A set published while waiting to retry supersedes the failing one.
    async fn reload_with_retry(
        &self,
        mut addrs: Vec<String>,
        shutdown: &mut ShutdownSignal,
    ) -> Result<()> {
        let device = self.reconciler.device();
        let mut attempt = 0;

        loop {
            match self.reconciler.reload(&addrs).await {
                Ok(()) => {
                    self.emit_event(EngineEvent::ReloadSucceeded {
                        device: device.to_string(),
                        addrs,
                    });
                    return Ok(());
                }
                Err(e) => {
                    attempt += 1;
                    self.emit_event(EngineEvent::ReloadFailed {
                        device: device.to_string(),
                        error: e.to_string(),
                        attempt,
                    });

                    if attempt > self.max_reload_retries {
                        error!(
                            "Reloading {} failed after {} attempt(s); giving up: {}",
                            device, attempt, e
                        );
                        return Err(e);
                    }
                    warn!("Reload attempt {} for {} failed: {}", attempt, device, e);
                }
            }

            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                _ = tokio::time::sleep(self.retry_delay) => {}
            }

            if let Some(newer) = self.watcher.notifier().try_take() {
                info!("Newer address set arrived; retrying {} with {:?}", device, newer);
                addrs = newer;
            }
        }
    }

    /// Emit an engine event
    ///
    /// Drops the event when the channel is full; nothing waits on monitoring.
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
