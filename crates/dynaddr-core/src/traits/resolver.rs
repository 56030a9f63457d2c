// # Resolver Trait
//
// Defines the interface for turning a hostname into its current addresses.
//
// ## Implementations
//
// - System resolver (getaddrinfo via tokio): `crate::resolver::SystemResolver`
// - Test doubles: `tests/common/mod.rs`
//
// ## Usage
//
// ```rust,ignore
// use dynaddr_core::Resolver;
//
// let addrs = resolver.lookup("vpn.example.com").await?;
// for addr in addrs {
//     println!("{addr}");
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for hostname resolvers
///
/// Every call performs a fresh lookup. Implementations must not cache
/// answers and must not retry internally; the watcher's poll cadence is
/// the retry policy.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `hostname` to its addresses
    ///
    /// # Returns
    ///
    /// - `Ok(addrs)`: At least one address, in resolver order (may repeat)
    /// - `Err(Error::Resolution)`: Lookup failed or produced no addresses
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, crate::Error>;
}
