//! Core domain types for the authring round simulation.
//!
//! This crate provides the leaf types shared by the coordination core and
//! the simulation harness:
//!
//! - [`NodeId`]: stable node identity, preserved across stop/restart
//! - [`Cycle`]: monotonic round index
//! - [`HashValue`]: the opaque value a round's winner publishes

mod hash;
mod identifiers;

pub use hash::HashValue;
pub use identifiers::{Cycle, NodeId};
