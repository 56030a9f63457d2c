//! DNS record watcher
//!
//! Polls a hostname on a fixed interval and publishes the resolved address
//! set whenever it differs from the last successful resolution.
//!
//! ## Tick state machine
//!
//! ```text
//!          tick                 resolved
//!  Idle ───────────▶ Checking ───────────▶ Unchanged ──▶ Idle
//!   ▲                   │   └────────────▶ Changed ──▶ Published ──▶ Idle
//!   │  tick while       │ lookup failed
//!   └── Checking ───────┴──────────────────────────────────────────▶ Idle
//!       (skip)
//! ```
//!
//! Each tick runs as its own task so a slow lookup never delays the timer.
//! The admission gate keeps at most one check in flight; ticks that find
//! it held are dropped, not queued.

pub mod change;
pub mod gate;

pub use change::AddressSet;
pub use gate::AdmissionGate;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::notifier::Notifier;
use crate::shutdown::ShutdownSignal;
use crate::traits::Resolver;

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another check held the gate; nothing was resolved
    Skipped,
    /// The lookup failed; snapshot and mailbox untouched
    Failed,
    /// The resolved set equals the snapshot
    Unchanged,
    /// The resolved set differs and was published (in publication order)
    Changed(Vec<String>),
}

/// Periodic resolver + change detector for one hostname
pub struct DnsRecordWatcher {
    resolver: Box<dyn Resolver>,
    hostname: String,
    interval: Duration,
    /// Only written by the gate holder
    snapshot: Mutex<AddressSet>,
    gate: AdmissionGate,
    notifier: Arc<Notifier<Vec<String>>>,
}

impl DnsRecordWatcher {
    /// Create a watcher with an empty snapshot and an empty mailbox
    ///
    /// The first successful lookup is therefore always reported as a change.
    ///
    /// # Errors
    ///
    /// `Error::Config` if `interval` is zero.
    pub fn new(
        resolver: Box<dyn Resolver>,
        hostname: impl Into<String>,
        interval: Duration,
    ) -> crate::Result<Self> {
        if interval.is_zero() {
            return Err(Error::config("watcher interval must be greater than zero"));
        }

        Ok(Self {
            resolver,
            hostname: hostname.into(),
            interval,
            snapshot: Mutex::new(AddressSet::new()),
            gate: AdmissionGate::new(),
            notifier: Arc::new(Notifier::new()),
        })
    }

    /// Hostname being watched
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Poll interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mailbox the changed address sets are published to
    pub fn notifier(&self) -> Arc<Notifier<Vec<String>>> {
        Arc::clone(&self.notifier)
    }

    /// Wait for the next changed address set
    pub async fn wait_for_change(&self) -> Vec<String> {
        self.notifier.wait().await
    }

    /// Copy of the last successfully resolved set
    pub fn snapshot(&self) -> AddressSet {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one admission-gated check
    pub async fn tick(&self) -> TickOutcome {
        let Some(_permit) = self.gate.try_enter() else {
            debug!("Another check of {} is in progress; skipping this tick", self.hostname);
            return TickOutcome::Skipped;
        };

        debug!("Start checking {} for address changes", self.hostname);
        let outcome = self.check_address_changes().await;
        debug!("Finished checking {}: {:?}", self.hostname, outcome);
        outcome
    }

    async fn check_address_changes(&self) -> TickOutcome {
        let resolved = match self.resolver.lookup(&self.hostname).await {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!("Failed to look up {}; continuing: {}", self.hostname, e);
                return TickOutcome::Failed;
            }
        };

        let addrs = {
            let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
            let (changed, current) = change::check(&snapshot, resolved);
            if !changed {
                return TickOutcome::Unchanged;
            }
            *snapshot = current;
            snapshot.to_strings()
        };

        self.notifier.publish(addrs.clone());
        info!(
            hostname = %self.hostname,
            addrs = ?addrs,
            "Addresses changed; published the new set"
        );
        TickOutcome::Changed(addrs)
    }

    /// Tick every `interval` until `shutdown` fires
    ///
    /// The first tick fires immediately. In-flight checks are aborted on
    /// shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownSignal) {
        info!("Watching {} every {:?}", self.hostname, self.interval);

        let mut ticks = IntervalStream::new(tokio::time::interval(self.interval));
        let mut checks = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("Shutdown requested; watcher stopping");
                    break;
                }

                Some(_) = ticks.next() => {
                    let watcher = Arc::clone(&self);
                    checks.spawn(async move { watcher.tick().await });
                }

                Some(joined) = checks.join_next() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Address check for {} panicked: {}", self.hostname, e);
                        }
                    }
                }
            }
        }

        checks.shutdown().await;
        info!("Stopped watching {}", self.hostname);
    }
}
