// # LinkControl Trait
//
// Defines the OS operations the reconciler needs on a network device.
//
// ## Implementations
//
// - rtnetlink (Linux): `dynaddr-netlink` crate
// - In-process device table: `crate::link::MemoryLink`

use async_trait::async_trait;
use ipnet::IpNet;
use std::fmt;

/// Opaque reference to a network device
///
/// Obtained from [`LinkControl::lookup`] and only meaningful for the
/// duration of a single reconciliation. Never cache it across reloads;
/// the device may be recreated with a new index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u32);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trait for network device backends
///
/// ## Primary slot
///
/// Each address family has a primary slot: the first address of that
/// family bound to the device. [`replace_address`](Self::replace_address)
/// takes over that slot; [`add_address`](Self::add_address) never touches
/// it and never removes anything.
#[async_trait]
pub trait LinkControl: Send + Sync {
    /// Resolve a device name to a handle
    ///
    /// # Returns
    ///
    /// - `Ok(LinkId)`: The device exists
    /// - `Err(Error::InterfaceLookup)`: No device with that name
    async fn lookup(&self, device: &str) -> Result<LinkId, crate::Error>;

    /// Upsert `address` into the primary slot of its family
    ///
    /// Whatever held the slot before is unbound unless it is the same
    /// address. Errors are reported as `Error::Reconciliation`.
    async fn replace_address(&self, link: LinkId, address: IpNet) -> Result<(), crate::Error>;

    /// Bind `address` in addition to what is already there
    ///
    /// Binding an address that is already present is a no-op.
    async fn add_address(&self, link: LinkId, address: IpNet) -> Result<(), crate::Error>;

    /// Administratively bring the device up (idempotent)
    async fn set_up(&self, link: LinkId) -> Result<(), crate::Error>;
}
