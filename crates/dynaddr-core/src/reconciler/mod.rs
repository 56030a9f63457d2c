//! Interface address reconciler
//!
//! Applies a resolved address set to a named network device:
//!
//! 1. Look the device up by name (fresh on every reload)
//! 2. Replace the primary slot with the first address
//! 3. Add every further address
//! 4. Bring the device up
//!
//! Reconciliation is convergent rather than diff-based, so it can be fed
//! the latest set at any time. It never unbinds non-primary addresses, not
//! even ones bound by an earlier reload that have since left the DNS record.
//!
//! ## Failure policy
//!
//! The first failure aborts the remaining steps and is returned as is.
//! Addresses applied before the failure stay applied.

use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::LinkControl;

/// A single address in network notation (address plus prefix length)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRecord(IpNet);

impl AddressRecord {
    /// Parse `10.0.0.1/24`-style notation or a bare address
    ///
    /// A bare address becomes a host prefix (/32 or /128), which is what a
    /// DNS answer maps to.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.contains('/') {
            return s
                .parse::<IpNet>()
                .map(Self)
                .map_err(|e| Error::address_parse(format!("'{}': {}", s, e)));
        }

        s.parse::<IpAddr>()
            .map(Self::from)
            .map_err(|e| Error::address_parse(format!("'{}': {}", s, e)))
    }

    /// The address and prefix as an [`IpNet`]
    pub fn net(&self) -> IpNet {
        self.0
    }

    /// The address without its prefix
    pub fn addr(&self) -> IpAddr {
        self.0.addr()
    }

    /// Prefix length in bits
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }
}

impl From<IpAddr> for AddressRecord {
    fn from(addr: IpAddr) -> Self {
        Self(IpNet::from(addr))
    }
}

impl FromStr for AddressRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Applies address sets to one named device
pub struct Reconciler {
    link: Box<dyn LinkControl>,
    device: String,
}

impl Reconciler {
    /// Create a reconciler for `device`
    ///
    /// The device does not need to exist yet; it is looked up on every
    /// reload.
    pub fn new(link: Box<dyn LinkControl>, device: impl Into<String>) -> Self {
        Self {
            link,
            device: device.into(),
        }
    }

    /// Device this reconciler manages
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Make the device carry `addresses`, first one as primary
    ///
    /// # Errors
    ///
    /// - `Error::Reconciliation`: `addresses` is empty, or a link operation failed
    /// - `Error::InterfaceLookup`: the device does not exist
    /// - `Error::AddressParse`: an entry is not valid address notation
    pub async fn reload<S>(&self, addresses: &[S]) -> Result<()>
    where
        S: AsRef<str> + Sync,
    {
        if addresses.is_empty() {
            return Err(Error::reconciliation(format!(
                "refusing to reload {} with an empty address set",
                self.device
            )));
        }

        let link = self.link.lookup(&self.device).await?;
        debug!("Reloading {} ({}) with {} address(es)", self.device, link, addresses.len());

        for (i, raw) in addresses.iter().enumerate() {
            let record = AddressRecord::parse(raw.as_ref())?;
            if i == 0 {
                self.link.replace_address(link, record.net()).await?;
                debug!("Replaced primary address of {} with {}", self.device, record);
            } else {
                self.link.add_address(link, record.net()).await?;
                debug!("Added {} to {}", record, self.device);
            }
        }

        self.link.set_up(link).await?;

        let applied: Vec<&str> = addresses.iter().map(|a| a.as_ref()).collect();
        info!(device = %self.device, addrs = ?applied, "Interface reloaded");
        Ok(())
    }
}
