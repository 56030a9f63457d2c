//! Minimal embedding example for dynaddr-core
//!
//! Drives a `DynAddrEngine` with a custom resolver and the in-memory link
//! backend. The application owns the engine lifecycle, including shutdown.

use dynaddr_core::traits::Resolver;
use dynaddr_core::{
    AddressRecord, DynAddrConfig, DynAddrEngine, EngineConfig, MemoryLink, Result, shutdown,
};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Resolver answering from an address list the application controls
#[derive(Clone)]
struct EmbeddedResolver {
    answer: Arc<Mutex<Vec<IpAddr>>>,
}

impl EmbeddedResolver {
    fn new(addrs: &[IpAddr]) -> Self {
        Self {
            answer: Arc::new(Mutex::new(addrs.to_vec())),
        }
    }

    /// Simulate the DNS record changing
    fn set(&self, addrs: &[IpAddr]) {
        *self.answer.lock().unwrap() = addrs.to_vec();
    }
}

#[async_trait::async_trait]
impl Resolver for EmbeddedResolver {
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>> {
        let addrs = self.answer.lock().unwrap().clone();
        println!("[Embedded] {} -> {:?}", hostname, addrs);
        Ok(addrs)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded dynaddr-core Example ===\n");

    let first = IpAddr::from([192, 0, 2, 10]);
    let second = IpAddr::from([192, 0, 2, 20]);

    // The device already carries an address from before the engine started
    let link = MemoryLink::new();
    link.add_device("wg0").await;
    link.bind("wg0", AddressRecord::parse("10.9.9.9/24")?.net()).await?;

    let resolver = EmbeddedResolver::new(&[first]);

    let config = DynAddrConfig::new("peer.example.com")
        .with_device("wg0")
        .with_poll_interval_secs(1)
        .with_engine(EngineConfig {
            max_reload_retries: 0,
            retry_delay_secs: 0,
            event_channel_capacity: 100,
        });

    println!("1. Creating engine...");
    let (engine, mut event_rx) =
        DynAddrEngine::new(Box::new(resolver.clone()), Box::new(link.clone()), config)?;

    let event_listener = tokio::spawn(async move {
        println!("2. Event listener started");
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
        println!("Event listener stopped");
    });

    println!("3. Starting engine in background...");
    let (trigger, signal) = shutdown::channel();
    let engine_handle = tokio::spawn(async move { engine.run_with_shutdown(signal).await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("\n4. wg0 now carries {:?}", link.addresses("wg0").await);

    println!("5. Adding a second address to the record...");
    resolver.set(&[first, second]);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    println!("   wg0 now carries {:?}\n", link.addresses("wg0").await);

    println!("6. Stopping engine...");
    trigger.trigger();
    if let Ok(result) = engine_handle.await {
        result?;
    }
    let _ = tokio::time::timeout(Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Engine lifecycle is fully controlled by the application");
    println!("- Shutdown is explicit and waits for the engine to finish");
    println!("- Resolver and link backend are both custom");

    Ok(())
}
