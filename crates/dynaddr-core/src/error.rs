//! Error types for dynaddr
//!
//! Resolution failures are the only class the core recovers from on its own.
//! Everything raised while reconciling an interface is surfaced to the caller.

use thiserror::Error;

/// Result type alias for dynaddr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dynaddr
#[derive(Error, Debug)]
pub enum Error {
    /// Hostname lookup failed or returned nothing
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// An address string is not valid network-address notation
    #[error("Address parse error: {0}")]
    AddressParse(String),

    /// The named network device does not exist
    #[error("Interface lookup error: {0}")]
    InterfaceLookup(String),

    /// Replacing, adding or activating failed on the device
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create an address parse error
    pub fn address_parse(msg: impl Into<String>) -> Self {
        Self::AddressParse(msg.into())
    }

    /// Create an interface lookup error
    pub fn interface_lookup(msg: impl Into<String>) -> Self {
        Self::InterfaceLookup(msg.into())
    }

    /// Create a reconciliation error
    pub fn reconciliation(msg: impl Into<String>) -> Self {
        Self::Reconciliation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the next poll cycle is expected to recover from this error
    ///
    /// Only resolution failures qualify; the watcher skips the cycle and
    /// tries again on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
