//! Transport module - address plumbing shared by acceptors and connectors.
//!
//! Provides:
//! - [`LocalAddressAllocator`] - ephemeral connector-side addresses
//! - [`EndpointRegistry`] - acceptor addresses and the services bound there

mod allocator;
mod registry;

pub use allocator::LocalAddressAllocator;
pub use registry::{BoundEntry, EndpointRegistry};
