//! Bound acceptor endpoints.
//!
//! Acceptors register themselves here under the address they bind; the
//! connector resolves a target address to its [`BoundEntry`] before building
//! a session pair. Lookups take a read lock and are safe alongside binds and
//! unbinds on other threads.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::address::PipeAddress;
use crate::error::{Result, VpipeError};
use crate::service::ServiceContext;

/// An acceptor bound at an address.
#[derive(Clone)]
pub struct BoundEntry {
    address: PipeAddress,
    service: Arc<ServiceContext>,
}

impl BoundEntry {
    /// The bound address.
    pub fn address(&self) -> PipeAddress {
        self.address
    }

    /// The acceptor service, carrying its handler and pipeline template.
    pub fn service(&self) -> &Arc<ServiceContext> {
        &self.service
    }
}

impl std::fmt::Debug for BoundEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundEntry")
            .field("address", &self.address)
            .finish()
    }
}

/// Address → acceptor map shared by all services of a hub.
#[derive(Default)]
pub struct EndpointRegistry {
    entries: RwLock<HashMap<PipeAddress, BoundEntry>>,
}

impl EndpointRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` at `address`.
    pub(crate) fn bind(&self, address: PipeAddress, service: &Arc<ServiceContext>) -> Result<()> {
        if address.is_ephemeral() {
            return Err(VpipeError::InvalidBindAddress(address));
        }

        match self.entries.write().entry(address) {
            Entry::Occupied(_) => Err(VpipeError::AddressInUse(address)),
            Entry::Vacant(slot) => {
                slot.insert(BoundEntry {
                    address,
                    service: Arc::clone(service),
                });
                Ok(())
            }
        }
    }

    /// Remove the binding at `address` if it belongs to `service`.
    pub(crate) fn unbind(&self, address: PipeAddress, service: &Arc<ServiceContext>) -> bool {
        let mut entries = self.entries.write();
        let owned = entries
            .get(&address)
            .is_some_and(|entry| Arc::ptr_eq(&entry.service, service));
        if owned {
            entries.remove(&address);
        }
        owned
    }

    /// Resolve an address.
    pub fn lookup(&self, address: &PipeAddress) -> Option<BoundEntry> {
        self.entries.read().get(address).cloned()
    }

    /// Whether anything is bound at `address`.
    pub fn is_bound(&self, address: &PipeAddress) -> bool {
        self.entries.read().contains_key(address)
    }

    /// All bound addresses, sorted.
    pub fn bound_addresses(&self) -> Vec<PipeAddress> {
        let mut addresses: Vec<_> = self.entries.read().keys().copied().collect();
        addresses.sort();
        addresses
    }
}

impl std::fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointRegistry")
            .field("bound", &self.bound_addresses())
            .finish()
    }
}
