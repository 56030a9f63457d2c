//! Test doubles and common utilities for contract tests
//!
//! Resolvers here are scripted or gated so tests decide exactly when a
//! lookup finishes and what it returns. Links wrap `MemoryLink` so the
//! resulting interface state can be inspected.

#![allow(dead_code)]

use dynaddr_core::error::{Error, Result};
use dynaddr_core::traits::{LinkControl, LinkId, Resolver};
use dynaddr_core::{DynAddrConfig, EngineConfig, MemoryLink};
use ipnet::IpNet;
use std::future::Future;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// Parse an address or prefix, panicking on typos in test code
pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn net(s: &str) -> IpNet {
    s.parse().unwrap()
}

/// A resolver whose answer the test can change at any time
#[derive(Clone)]
pub struct ControlledResolver {
    answer: Arc<Mutex<std::result::Result<Vec<IpAddr>, String>>>,
    lookup_count: Arc<AtomicUsize>,
}

impl ControlledResolver {
    pub fn new(addrs: &[&str]) -> Self {
        Self {
            answer: Arc::new(Mutex::new(Ok(addrs.iter().map(|a| ip(a)).collect()))),
            lookup_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer future lookups with `addrs`
    pub fn set_answer(&self, addrs: &[&str]) {
        *self.answer.lock().unwrap() = Ok(addrs.iter().map(|a| ip(a)).collect());
    }

    /// Fail future lookups
    pub fn set_failure(&self, msg: &str) {
        *self.answer.lock().unwrap() = Err(msg.to_string());
    }

    /// Get the number of times lookup() was called
    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Resolver for ControlledResolver {
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .map_err(|msg| Error::resolution(format!("{}: {}", hostname, msg)))
    }
}

/// A resolver that blocks each lookup until the test releases it
#[derive(Clone)]
pub struct GatedResolver {
    addrs: Vec<IpAddr>,
    entered: Arc<Notify>,
    release: Arc<Semaphore>,
    lookup_count: Arc<AtomicUsize>,
}

impl GatedResolver {
    pub fn new(addrs: &[&str]) -> Self {
        Self {
            addrs: addrs.iter().map(|a| ip(a)).collect(),
            entered: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
            lookup_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait until some lookup has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one blocked lookup finish
    pub fn release_one(&self) {
        self.release.add_permits(1);
    }

    /// Get the number of times lookup() was called
    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Resolver for GatedResolver {
    async fn lookup(&self, _hostname: &str) -> Result<Vec<IpAddr>> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let permit = self
            .release
            .acquire()
            .await
            .map_err(|e| Error::resolution(e.to_string()))?;
        permit.forget();
        Ok(self.addrs.clone())
    }
}

/// A link that fails `set_up` a configurable number of times
#[derive(Clone)]
pub struct FlakyLink {
    inner: MemoryLink,
    failures_left: Arc<AtomicUsize>,
    set_up_count: Arc<AtomicUsize>,
}

impl FlakyLink {
    pub fn new(inner: MemoryLink, failures: usize) -> Self {
        Self {
            inner,
            failures_left: Arc::new(AtomicUsize::new(failures)),
            set_up_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times set_up() was called
    pub fn set_up_count(&self) -> usize {
        self.set_up_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LinkControl for FlakyLink {
    async fn lookup(&self, device: &str) -> Result<LinkId> {
        self.inner.lookup(device).await
    }

    async fn replace_address(&self, link: LinkId, address: IpNet) -> Result<()> {
        self.inner.replace_address(link, address).await
    }

    async fn add_address(&self, link: LinkId, address: IpNet) -> Result<()> {
        self.inner.add_address(link, address).await
    }

    async fn set_up(&self, link: LinkId) -> Result<()> {
        self.set_up_count.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::reconciliation("operation not permitted"));
        }
        self.inner.set_up(link).await
    }
}

/// A MemoryLink with one device already present
pub async fn link_with_device(device: &str, existing: &[&str]) -> MemoryLink {
    let link = MemoryLink::new();
    link.add_device(device).await;
    for addr in existing {
        link.bind(device, net(addr)).await.unwrap();
    }
    link
}

/// Helper to create a minimal config for testing
///
/// One-second poll interval, no retries, no retry delay.
pub fn minimal_config(hostname: &str, device: &str) -> DynAddrConfig {
    DynAddrConfig {
        hostname: hostname.to_string(),
        device: device.to_string(),
        poll_interval_secs: 1,
        engine: EngineConfig {
            max_reload_retries: 0,
            retry_delay_secs: 0,
            event_channel_capacity: 100,
        },
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub async fn eventually<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
