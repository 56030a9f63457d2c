// # Memory Link
//
// In-memory implementation of LinkControl.
//
// ## Purpose
//
// Models a set of network devices without touching the host. Useful for
// testing the reconciler and the engine, and for dry runs on machines where
// the daemon lacks CAP_NET_ADMIN.
//
// ## Model
//
// - Each device keeps its addresses in binding order
// - The primary slot of a family is the first globally scoped address of
//   that family; loopback and IPv6 link-local addresses never occupy it
// - Devices start administratively down
// - Devices can be added and removed at runtime to exercise lookup failures

use async_trait::async_trait;
use ipnet::IpNet;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::{LinkControl, LinkId};

#[derive(Debug, Clone)]
struct MemoryDevice {
    id: LinkId,
    addresses: Vec<IpNet>,
    up: bool,
}

impl MemoryDevice {
    fn primary_position(&self, address: &IpNet) -> Option<usize> {
        self.addresses
            .iter()
            .position(|a| holds_primary(a, address.addr().is_ipv4()))
    }
}

/// Whether `address` can be the primary of the given family
///
/// Mirrors the kernel's scope assignment: loopback is host scope and
/// fe80::/10 is link scope, everything else is universe scope.
fn holds_primary(address: &IpNet, ipv4: bool) -> bool {
    match address.addr() {
        IpAddr::V4(a) => ipv4 && !a.is_loopback(),
        IpAddr::V6(a) => !ipv4 && !a.is_loopback() && !a.is_unicast_link_local(),
    }
}

/// In-memory link backend
///
/// Cloning shares the same device table, so a test can keep one handle for
/// inspection while the reconciler owns another.
///
/// # Example
///
/// ```rust,no_run
/// use dynaddr_core::link::MemoryLink;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let link = MemoryLink::new();
///     link.add_device("wg0").await;
///     link.bind("wg0", "10.0.0.9/24".parse()?).await?;
///
///     assert_eq!(link.addresses("wg0").await, Some(vec!["10.0.0.9/24".parse::<ipnet::IpNet>()?]));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLink {
    devices: Arc<RwLock<HashMap<String, MemoryDevice>>>,
    next_index: Arc<AtomicU32>,
}

impl MemoryLink {
    /// Create a backend with no devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device (or return the existing one's handle)
    pub async fn add_device(&self, name: impl Into<String>) -> LinkId {
        let mut devices = self.devices.write().await;
        devices
            .entry(name.into())
            .or_insert_with(|| MemoryDevice {
                id: LinkId(self.next_index.fetch_add(1, Ordering::Relaxed) + 1),
                addresses: Vec::new(),
                up: false,
            })
            .id
    }

    /// Remove a device, returning whether it existed
    pub async fn remove_device(&self, name: &str) -> bool {
        self.devices.write().await.remove(name).is_some()
    }

    /// Bind an address directly, bypassing reconciliation
    ///
    /// Used to seed addresses that were present before the daemon started.
    pub async fn bind(&self, name: &str, address: IpNet) -> Result<(), Error> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(name)
            .ok_or_else(|| Error::interface_lookup(format!("no such device: {}", name)))?;
        if !device.addresses.contains(&address) {
            device.addresses.push(address);
        }
        Ok(())
    }

    /// Addresses bound to a device, in binding order
    pub async fn addresses(&self, name: &str) -> Option<Vec<IpNet>> {
        self.devices
            .read()
            .await
            .get(name)
            .map(|d| d.addresses.clone())
    }

    /// Primary address of a device for the given family
    pub async fn primary(&self, name: &str, ipv4: bool) -> Option<IpNet> {
        self.devices
            .read()
            .await
            .get(name)?
            .addresses
            .iter()
            .find(|a| holds_primary(a, ipv4))
            .copied()
    }

    /// Whether a device is administratively up
    pub async fn is_up(&self, name: &str) -> bool {
        self.devices
            .read()
            .await
            .get(name)
            .is_some_and(|d| d.up)
    }

    async fn with_device<T>(
        &self,
        link: LinkId,
        f: impl FnOnce(&mut MemoryDevice) -> T,
    ) -> Result<T, Error> {
        let mut devices = self.devices.write().await;
        let device = devices
            .values_mut()
            .find(|d| d.id == link)
            .ok_or_else(|| Error::reconciliation(format!("device {} disappeared", link)))?;
        Ok(f(device))
    }
}

#[async_trait]
impl LinkControl for MemoryLink {
    async fn lookup(&self, device: &str) -> Result<LinkId, Error> {
        self.devices
            .read()
            .await
            .get(device)
            .map(|d| d.id)
            .ok_or_else(|| Error::interface_lookup(format!("no such device: {}", device)))
    }

    async fn replace_address(&self, link: LinkId, address: IpNet) -> Result<(), Error> {
        self.with_device(link, |device| {
            if let Some(pos) = device.primary_position(&address) {
                if device.addresses[pos].addr() != address.addr() {
                    device.addresses.retain(|a| a.addr() != address.addr());
                }
            }
            // Recomputed, the retain may have shifted the slot
            match device.primary_position(&address) {
                Some(pos) => device.addresses[pos] = address,
                None => device.addresses.push(address),
            }
        })
        .await
    }

    async fn add_address(&self, link: LinkId, address: IpNet) -> Result<(), Error> {
        self.with_device(link, |device| {
            if !device.addresses.contains(&address) {
                device.addresses.push(address);
            }
        })
        .await
    }

    async fn set_up(&self, link: LinkId) -> Result<(), Error> {
        self.with_device(link, |device| device.up = true).await
    }
}
