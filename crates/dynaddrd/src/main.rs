// # dynaddrd - dynaddr Daemon
//
// Thin integration layer. All watching and reconciliation logic lives in
// dynaddr-core; this binary only:
// 1. Reads configuration (JSON file or environment variables)
// 2. Initializes logging and the runtime
// 3. Connects the link backend
// 4. Runs the engine until a signal arrives or reconciliation fails fatally
//
// ## Configuration
//
// - `DYNADDR_CONFIG`: Path to a JSON config file. When set, the variables
//   below except `DYNADDR_LOG_LEVEL` are ignored.
// - `DYNADDR_HOSTNAME`: Hostname to watch (required)
// - `DYNADDR_DEVICE`: Interface to reconcile (default: wg0)
// - `DYNADDR_POLL_INTERVAL_SECS`: Seconds between lookups (default: 60)
// - `DYNADDR_MAX_RETRIES`: Reload retries before giving up (default: 3)
// - `DYNADDR_RETRY_DELAY_SECS`: Seconds between reload retries (default: 5)
// - `DYNADDR_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export DYNADDR_HOSTNAME=peer.example.com
// export DYNADDR_DEVICE=wg0
// export DYNADDR_POLL_INTERVAL_SECS=30
//
// sudo -E dynaddrd
// ```

use anyhow::{Context, Result};
use dynaddr_core::{DynAddrConfig, DynAddrEngine, EngineConfig, SystemResolver, shutdown};
use std::env;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Fatal runtime error (interface missing, reconciliation exhausted)
#[derive(Debug, Clone, Copy)]
enum DynAddrExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unrecoverable)
    RuntimeError = 2,
}

impl From<DynAddrExitCode> for ExitCode {
    fn from(code: DynAddrExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Parse an optional numeric environment variable
fn env_number<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number. Got: {}", name, raw)),
        Err(_) => Ok(None),
    }
}

/// Load configuration from `DYNADDR_CONFIG` or the environment
fn load_config() -> Result<DynAddrConfig> {
    if let Ok(path) = env::var("DYNADDR_CONFIG") {
        return DynAddrConfig::from_json_file(&path)
            .with_context(|| format!("reading config file {}", path));
    }

    let hostname = env::var("DYNADDR_HOSTNAME").context(
        "DYNADDR_HOSTNAME is required. \
        Set it via: export DYNADDR_HOSTNAME=peer.example.com",
    )?;

    let mut config = DynAddrConfig::new(hostname);
    if let Ok(device) = env::var("DYNADDR_DEVICE") {
        config.device = device;
    }
    if let Some(secs) = env_number("DYNADDR_POLL_INTERVAL_SECS")? {
        config.poll_interval_secs = secs;
    }

    let defaults = EngineConfig::default();
    config.engine = EngineConfig {
        max_reload_retries: env_number("DYNADDR_MAX_RETRIES")?
            .unwrap_or(defaults.max_reload_retries),
        retry_delay_secs: env_number("DYNADDR_RETRY_DELAY_SECS")?
            .unwrap_or(defaults.retry_delay_secs),
        ..defaults
    };

    Ok(config)
}

/// Map `DYNADDR_LOG_LEVEL` to a tracing level
fn log_level() -> Result<Level> {
    let raw = env::var("DYNADDR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DYNADDR_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

fn main() -> ExitCode {
    let log_level = match log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DynAddrExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DynAddrExitCode::ConfigError.into();
    }

    let config = match load_config().and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DynAddrExitCode::ConfigError.into();
        }
    };

    info!("Starting dynaddrd");
    info!(
        "Watching {} every {}s for device {}",
        config.hostname, config.poll_interval_secs, config.device
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DynAddrExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Build the engine and run it until shutdown
async fn run_daemon(config: DynAddrConfig) -> DynAddrExitCode {
    let link = match connect_link() {
        Ok(link) => link,
        Err(e) => {
            error!("Failed to open link backend: {:#}", e);
            return DynAddrExitCode::ConfigError;
        }
    };

    let (engine, events) = match DynAddrEngine::new(Box::new(SystemResolver::new()), link, config)
    {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to build engine: {}", e);
            return DynAddrExitCode::ConfigError;
        }
    };
    tokio::spawn(log_events(events));

    let (trigger, signal) = shutdown::channel();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(name) => info!("Received shutdown signal: {}", name),
            Err(e) => error!("Signal handling failed, shutting down: {}", e),
        }
        trigger.trigger();
    });

    match engine.run_with_shutdown(signal).await {
        Ok(()) => {
            info!("Shutting down daemon");
            DynAddrExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Fatal error; exiting: {}", e);
            DynAddrExitCode::RuntimeError
        }
    }
}

#[cfg(feature = "netlink")]
fn connect_link() -> Result<Box<dyn dynaddr_core::LinkControl>> {
    info!("Using netlink link backend");
    Ok(Box::new(dynaddr_netlink::NetlinkLink::connect()?))
}

#[cfg(not(feature = "netlink"))]
fn connect_link() -> Result<Box<dyn dynaddr_core::LinkControl>> {
    anyhow::bail!("dynaddrd was built without a link backend; enable the 'netlink' feature")
}

/// Drain engine events into the debug log
async fn log_events(mut events: mpsc::Receiver<dynaddr_core::EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
