// # dynaddr-core
//
// Core library that keeps a network interface's addresses in step with the
// DNS record of a hostname.
//
// ## Architecture Overview
//
// - **Resolver**: Trait for turning a hostname into its current addresses
// - **DnsRecordWatcher**: Polls the resolver, compares against a snapshot,
//   publishes changes (one check in flight at a time)
// - **Notifier**: Single-slot mailbox; only the newest address set survives
// - **Reconciler**: Replaces the primary address, adds the rest, brings the
//   interface up
// - **LinkControl**: Trait for the OS operations the reconciler needs
// - **DynAddrEngine**: Runs watcher and consumer loop until shutdown or a
//   fatal reconciliation error
//
// ## Design Principles
//
// 1. **Latest value wins**: The mailbox never queues stale sets
// 2. **Convergent reconciliation**: Reloading the same set twice is harmless
// 3. **Library-First**: The daemon only wires configuration, logging and signals
// 4. **Errors go up**: Only resolution failures are absorbed by the core

pub mod traits;
pub mod engine;
pub mod watcher;
pub mod notifier;
pub mod reconciler;
pub mod resolver;
pub mod link;
pub mod config;
pub mod error;
pub mod shutdown;

// Re-export core types for convenience
pub use traits::{LinkControl, LinkId, Resolver};
pub use engine::{DynAddrEngine, EngineEvent};
pub use watcher::{AddressSet, DnsRecordWatcher, TickOutcome};
pub use notifier::Notifier;
pub use reconciler::{AddressRecord, Reconciler};
pub use resolver::SystemResolver;
pub use link::MemoryLink;
pub use config::{DynAddrConfig, EngineConfig};
pub use error::{Error, Result};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
