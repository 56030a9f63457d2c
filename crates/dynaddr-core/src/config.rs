//! Configuration types for dynaddr
//!
//! This module defines the settings consumed by the watcher, the reconciler
//! and the engine that ties them together.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest device name the kernel accepts (IFNAMSIZ minus the terminator)
pub const MAX_DEVICE_NAME_LEN: usize = 15;

/// Main dynaddr configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynAddrConfig {
    /// Hostname whose DNS record drives the interface addresses
    pub hostname: String,

    /// Network device to reconcile (e.g., "wg0")
    #[serde(default = "default_device")]
    pub device: String,

    /// Interval between lookups (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DynAddrConfig {
    /// Create a configuration for `hostname` with default settings
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            device: default_device(),
            poll_interval_secs: default_poll_interval_secs(),
            engine: EngineConfig::default(),
        }
    }

    /// Set the device to reconcile
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Set the engine settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Parse a configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_hostname(&self.hostname)?;

        if self.device.is_empty() {
            return Err(crate::Error::config("Device name cannot be empty"));
        }
        if self.device.len() > MAX_DEVICE_NAME_LEN {
            return Err(crate::Error::config(format!(
                "Device name too long: {} bytes (max {}). Got: {}",
                self.device.len(),
                MAX_DEVICE_NAME_LEN,
                self.device
            )));
        }
        if self.device.contains(['/', ' ']) {
            return Err(crate::Error::config(format!(
                "Device name contains invalid characters: '{}'",
                self.device
            )));
        }

        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }

        self.engine.validate()
    }
}

/// Basic RFC 1035 hostname validation
///
/// Not exhaustive, but catches empty labels, oversized names and stray
/// characters before they reach the resolver.
pub fn validate_hostname(hostname: &str) -> Result<(), crate::Error> {
    if hostname.is_empty() {
        return Err(crate::Error::config("Hostname cannot be empty"));
    }

    // A single trailing dot marks a fully-qualified name
    let name = hostname.strip_suffix('.').unwrap_or(hostname);

    if name.len() > 253 {
        return Err(crate::Error::config(format!(
            "Hostname too long: {} chars (max 253). Got: {}",
            name.len(),
            hostname
        )));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Hostname has empty label: '{}'",
                hostname
            )));
        }
        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Hostname label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Hostname label contains invalid characters. Label: '{}'",
                label
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Hostname label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retries for a failed reload before the engine gives up
    ///
    /// Set to 0 to treat the first reconciliation failure as fatal.
    #[serde(default = "default_max_reload_retries")]
    pub max_reload_retries: usize,

    /// Delay between reload attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Delay between reload attempts as a [`Duration`]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reload_retries: default_max_reload_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_device() -> String {
    "wg0".to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_reload_retries() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = DynAddrConfig::from_json_str(r#"{"hostname": "vpn.example.com"}"#).unwrap();

        assert_eq!(config.device, "wg0");
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_engine_settings_are_read() {
        let config = DynAddrConfig::from_json_str(
            r#"{
                "hostname": "vpn.example.com",
                "device": "wg1",
                "poll_interval_secs": 15,
                "engine": { "max_reload_retries": 0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.device, "wg1");
        assert_eq!(config.poll_interval_secs, 15);
        assert_eq!(config.engine.max_reload_retries, 0);
        assert_eq!(config.engine.retry_delay_secs, 5);
    }

    #[test]
    fn missing_hostname_is_a_json_error() {
        let err = DynAddrConfig::from_json_str(r#"{"device": "wg0"}"#).unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"hostname": "peer.example.net", "device": "wg2"}}"#).unwrap();

        let config = DynAddrConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.hostname, "peer.example.net");
        assert_eq!(config.device, "wg2");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DynAddrConfig::from_json_file("/nonexistent/dynaddr.json").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn rejects_bad_hostnames() {
        for bad in ["", "a..b", "-lead.example.com", "trail-.example.com", "under_score.com"] {
            let config = DynAddrConfig::new(bad);
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }

        let long_label = format!("{}.com", "a".repeat(64));
        assert!(DynAddrConfig::new(long_label).validate().is_err());
    }

    #[test]
    fn accepts_fully_qualified_hostname() {
        assert!(validate_hostname("vpn.example.com.").is_ok());
        assert!(validate_hostname("localhost").is_ok());
    }

    #[test]
    fn rejects_bad_devices_and_intervals() {
        let base = DynAddrConfig::new("vpn.example.com");

        assert!(base.clone().with_device("").validate().is_err());
        assert!(base.clone().with_device("a-very-long-device0").validate().is_err());
        assert!(base.clone().with_device("wg/0").validate().is_err());
        assert!(base.clone().with_poll_interval_secs(0).validate().is_err());

        let engine = EngineConfig {
            event_channel_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(base.with_engine(engine).validate().is_err());
    }
}
