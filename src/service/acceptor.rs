//! Acceptor side: binds addresses that connectors can reach.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ServiceContext, ServiceKind, ServiceListener, ServiceParts};
use crate::address::PipeAddress;
use crate::config::SessionConfig;
use crate::error::{Result, VpipeError};
use crate::handler::IoHandler;
use crate::hub::PipeHub;
use crate::pipeline::{Filter, PipelineTemplate};
use crate::session::PipeSession;

/// Builder for a [`PipeAcceptor`].
pub struct AcceptorBuilder {
    parts: ServiceParts,
}

impl AcceptorBuilder {
    /// Start a builder around `handler`.
    pub fn new(handler: Arc<dyn IoHandler>) -> Self {
        Self {
            parts: ServiceParts::new(handler),
        }
    }

    /// Append a filter shared by every accepted session.
    pub fn filter<F: Filter>(mut self, name: &str, filter: F) -> Self {
        self.parts.filter(name, filter);
        self
    }

    /// Replace the whole pipeline template.
    pub fn pipeline(mut self, template: PipelineTemplate) -> Self {
        self.parts.pipeline(template);
        self
    }

    /// Set the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.parts.session_config(config);
        self
    }

    /// Add a service listener.
    pub fn listener(mut self, listener: Arc<dyn ServiceListener>) -> Self {
        self.parts.listener(listener);
        self
    }

    /// Build the acceptor on `hub`. Nothing is bound yet.
    pub fn build(self, hub: &PipeHub) -> PipeAcceptor {
        PipeAcceptor {
            hub: hub.clone(),
            service: ServiceContext::new(ServiceKind::Acceptor, self.parts),
            bound: Mutex::new(BTreeSet::new()),
        }
    }
}

/// Accepts virtual pipe connections at one or more bound addresses.
///
/// Dropping the acceptor unbinds its addresses; sessions already accepted
/// stay open until closed or until [`dispose`](Self::dispose) is called.
pub struct PipeAcceptor {
    hub: PipeHub,
    service: Arc<ServiceContext>,
    bound: Mutex<BTreeSet<PipeAddress>>,
}

impl PipeAcceptor {
    /// Create a builder.
    pub fn builder(handler: Arc<dyn IoHandler>) -> AcceptorBuilder {
        AcceptorBuilder::new(handler)
    }

    /// Make this acceptor reachable at `address`.
    ///
    /// Fails with [`VpipeError::AddressInUse`] if another acceptor holds the
    /// address, or [`VpipeError::InvalidBindAddress`] for negative addresses.
    pub fn bind(&self, address: PipeAddress) -> Result<()> {
        // Held across the registry bind so a concurrent dispose cannot
        // unbind before the address is recorded.
        let mut bound = self.bound.lock();
        if self.service.is_disposed() {
            return Err(VpipeError::ServiceDisposed);
        }
        self.hub.registry().bind(address, &self.service)?;
        bound.insert(address);
        drop(bound);
        tracing::debug!("Acceptor bound at {}", address);
        Ok(())
    }

    /// Stop accepting at `address`. Returns false if it was not bound here.
    pub fn unbind(&self, address: PipeAddress) -> bool {
        let removed = self.bound.lock().remove(&address);
        if removed {
            self.hub.registry().unbind(address, &self.service);
            tracing::debug!("Acceptor unbound from {}", address);
        }
        removed
    }

    /// Addresses this acceptor is bound at, sorted.
    pub fn local_addresses(&self) -> Vec<PipeAddress> {
        self.bound.lock().iter().copied().collect()
    }

    /// Accepted sessions that are still open.
    pub fn managed_sessions(&self) -> Vec<PipeSession> {
        self.service.managed_sessions()
    }

    /// The acceptor's shared service state.
    pub fn service(&self) -> &Arc<ServiceContext> {
        &self.service
    }

    /// Unbind everything and close every accepted session.
    pub fn dispose(&self) {
        let first = self.service.dispose();
        self.unbind_all();
        if first {
            tracing::debug!("Acceptor disposed");
        }
    }

    fn unbind_all(&self) {
        let addresses = std::mem::take(&mut *self.bound.lock());
        for address in addresses {
            self.hub.registry().unbind(address, &self.service);
        }
    }
}

impl Drop for PipeAcceptor {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

impl std::fmt::Debug for PipeAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeAcceptor")
            .field("bound", &self.local_addresses())
            .field("service", &self.service)
            .finish()
    }
}
