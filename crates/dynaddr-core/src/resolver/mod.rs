//! Resolver implementations
//!
//! - [`SystemResolver`]: The host's name-resolution facility

pub mod system;

pub use system::SystemResolver;
