//! Core traits for dynaddr
//!
//! This module defines the seams between the control loop and the host:
//!
//! - [`Resolver`]: Turn a hostname into its current addresses
//! - [`LinkControl`]: Look up a network device and mutate its addresses

pub mod resolver;
pub mod link_control;

pub use resolver::Resolver;
pub use link_control::{LinkControl, LinkId};
