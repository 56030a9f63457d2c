//! Link backend implementations
//!
//! - [`MemoryLink`]: In-process device table (tests, dry runs)
//!
//! The Linux rtnetlink backend lives in the `dynaddr-netlink` crate.

pub mod memory;

pub use memory::MemoryLink;
