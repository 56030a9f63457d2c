// # System Resolver
//
// Resolves hostnames through the host's resolver (getaddrinfo), the same
// path every other program on the machine takes. That means /etc/hosts,
// nsswitch and the configured nameservers all apply.
//
// ## Timeouts
//
// Lookups are bounded by the host resolver's own timeout and are not
// separately enforced here. A slow lookup simply keeps the watcher's
// admission gate held, so later ticks are skipped rather than queued.

use async_trait::async_trait;
use std::net::IpAddr;
use tracing::debug;

use crate::traits::Resolver;
use crate::Error;

/// Resolver backed by `tokio::net::lookup_host`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    /// Create a new system resolver
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, Error> {
        // Port 0 is only there to satisfy ToSocketAddrs.
        let answers = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|e| Error::resolution(format!("lookup of {} failed: {}", hostname, e)))?;

        let addrs: Vec<IpAddr> = answers.map(|sa| sa.ip()).collect();
        if addrs.is_empty() {
            return Err(Error::resolution(format!(
                "lookup of {} returned no addresses",
                hostname
            )));
        }

        debug!("Resolved {} -> {:?}", hostname, addrs);
        Ok(addrs)
    }
}
