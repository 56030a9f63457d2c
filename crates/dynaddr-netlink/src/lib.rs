// # Netlink Link Control
//
// This crate drives a network device's addresses through rtnetlink on
// Linux systems.
//
// ## Operations
//
// - lookup:          RTM_GETLINK filtered by name
// - replace_address: RTM_DELADDR of the family's current primary (if it is a
//                    different address), then RTM_NEWADDR with NLM_F_REPLACE,
//                    then RTM_NEWADDR for every address the delete took along
// - add_address:     RTM_NEWADDR unless the address is already bound
// - set_up:          RTM_SETLINK with IFF_UP
//
// The kernel only matches NLM_F_REPLACE against an identical local address,
// which is why the old primary is removed explicitly.
//
// ## Primary slot
//
// The primary of a family is the first universe-scope address in the dump.
// Host-scope (loopback) and link-scope (fe80::/10) addresses are never
// superseded.
//
// ## Secondary flush
//
// With the default `promote_secondaries=0`, deleting an IPv4 primary also
// deletes every secondary in its subnet. The addresses bound before the
// delete are recorded and any that vanished are bound again afterwards, so
// a reload never loses a non-primary address. The sysctl is left alone.
//
// ## Privileges
//
// Every mutation needs CAP_NET_ADMIN. Without it the kernel answers EPERM,
// which surfaces as `Error::Reconciliation`.
//
// ## Platform Support
//
// On other platforms `NetlinkLink::connect` fails with a configuration error.

use async_trait::async_trait;
use dynaddr_core::traits::{LinkControl, LinkId};
use dynaddr_core::{Error, Result};
use ipnet::IpNet;

#[cfg(target_os = "linux")]
use futures::TryStreamExt;

#[cfg(target_os = "linux")]
use netlink_packet_route::{AddressMessage, RT_SCOPE_UNIVERSE};

#[cfg(target_os = "linux")]
use netlink_packet_route::address::nlas::Nla as AddressNla;

#[cfg(target_os = "linux")]
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[cfg(target_os = "linux")]
use tracing::debug;

/// rtnetlink-backed link control (Linux)
#[cfg(target_os = "linux")]
pub struct NetlinkLink {
    handle: rtnetlink::Handle,
    /// Background task driving the netlink socket
    connection: tokio::task::JoinHandle<()>,
}

#[cfg(target_os = "linux")]
impl NetlinkLink {
    /// Open a route netlink socket
    ///
    /// Must be called from within a tokio runtime; the socket is driven by
    /// a task that lives as long as this value.
    pub fn connect() -> Result<Self> {
        let (connection, handle, _) = rtnetlink::new_connection()?;
        let connection = tokio::spawn(connection);
        Ok(Self { handle, connection })
    }

    /// Addresses currently bound to `link`, with their raw messages
    async fn bound_addresses(&self, link: LinkId) -> Result<Vec<(IpNet, AddressMessage)>> {
        let mut messages = self
            .handle
            .address()
            .get()
            .set_link_index_filter(link.0)
            .execute();

        let mut bound = Vec::new();
        while let Some(message) = messages
            .try_next()
            .await
            .map_err(|e| Error::reconciliation(format!("listing addresses of {}: {}", link, e)))?
        {
            if let Some(net) = address_of(&message) {
                bound.push((net, message));
            }
        }
        Ok(bound)
    }

    async fn new_address(&self, link: LinkId, address: IpNet, replace: bool) -> Result<()> {
        let request = self
            .handle
            .address()
            .add(link.0, address.addr(), address.prefix_len());
        let request = if replace { request.replace() } else { request };

        request
            .execute()
            .await
            .map_err(|e| Error::reconciliation(format!("binding {} to {}: {}", address, link, e)))
    }
}

#[cfg(target_os = "linux")]
impl Drop for NetlinkLink {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

/// Extract the local address and prefix from an RTM_NEWADDR message
///
/// Point-to-point links report the peer as IFA_ADDRESS, so IFA_LOCAL wins
/// when both are present.
#[cfg(target_os = "linux")]
fn address_of(message: &AddressMessage) -> Option<IpNet> {
    let mut local = None;
    let mut address = None;
    for nla in &message.nlas {
        match nla {
            AddressNla::Local(bytes) => local = ip_from_bytes(bytes),
            AddressNla::Address(bytes) => address = ip_from_bytes(bytes),
            _ => {}
        }
    }
    IpNet::new(local.or(address)?, message.header.prefix_len).ok()
}

#[cfg(target_os = "linux")]
fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl LinkControl for NetlinkLink {
    async fn lookup(&self, device: &str) -> Result<LinkId> {
        let mut links = self
            .handle
            .link()
            .get()
            .match_name(device.to_string())
            .execute();

        match links.try_next().await {
            Ok(Some(link)) => Ok(LinkId(link.header.index)),
            Ok(None) => Err(Error::interface_lookup(format!("no such device: {}", device))),
            Err(e) => Err(Error::interface_lookup(format!("{}: {}", device, e))),
        }
    }

    async fn replace_address(&self, link: LinkId, address: IpNet) -> Result<()> {
        let mut bound = self.bound_addresses(link).await?;
        let primary = bound.iter().position(|(net, message)| {
            message.header.scope == RT_SCOPE_UNIVERSE
                && net.addr().is_ipv4() == address.addr().is_ipv4()
        });

        let Some(pos) = primary.filter(|&pos| bound[pos].0.addr() != address.addr()) else {
            return self.new_address(link, address, true).await;
        };

        let (old, message) = bound.swap_remove(pos);
        debug!("Unbinding previous primary {} from {}", old, link);
        self.handle
            .address()
            .del(message)
            .execute()
            .await
            .map_err(|e| Error::reconciliation(format!("unbinding {} from {}: {}", old, link, e)))?;

        self.new_address(link, address, true).await?;

        let remaining: Vec<IpNet> = self
            .bound_addresses(link)
            .await?
            .into_iter()
            .map(|(net, _)| net)
            .collect();
        for (net, _) in bound {
            if net.addr() != address.addr() && !remaining.contains(&net) {
                debug!("Rebinding {} to {} after the primary was replaced", net, link);
                self.new_address(link, net, false).await?;
            }
        }
        Ok(())
    }

    async fn add_address(&self, link: LinkId, address: IpNet) -> Result<()> {
        let already_bound = self
            .bound_addresses(link)
            .await?
            .iter()
            .any(|(net, _)| *net == address);
        if already_bound {
            debug!("{} already bound to {}", address, link);
            return Ok(());
        }

        self.new_address(link, address, false).await
    }

    async fn set_up(&self, link: LinkId) -> Result<()> {
        self.handle
            .link()
            .set(link.0)
            .up()
            .execute()
            .await
            .map_err(|e| Error::reconciliation(format!("bringing {} up: {}", link, e)))
    }
}

/// Placeholder for non-Linux targets; cannot be constructed
#[cfg(not(target_os = "linux"))]
pub struct NetlinkLink {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl NetlinkLink {
    /// Always fails: netlink only exists on Linux
    pub fn connect() -> Result<Self> {
        Err(Error::config("Netlink link control is only supported on Linux"))
    }
}

#[cfg(not(target_os = "linux"))]
#[async_trait]
impl LinkControl for NetlinkLink {
    async fn lookup(&self, device: &str) -> Result<LinkId> {
        Err(Error::interface_lookup(format!("{}: netlink unavailable", device)))
    }

    async fn replace_address(&self, _link: LinkId, _address: IpNet) -> Result<()> {
        Err(Error::reconciliation("netlink unavailable"))
    }

    async fn add_address(&self, _link: LinkId, _address: IpNet) -> Result<()> {
        Err(Error::reconciliation("netlink unavailable"))
    }

    async fn set_up(&self, _link: LinkId) -> Result<()> {
        Err(Error::reconciliation("netlink unavailable"))
    }
}
