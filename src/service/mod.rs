//! Service module - acceptors, connectors and what they share.
//!
//! Both kinds of service own a handler, a pipeline template, a session
//! configuration and a set of [`ServiceListener`]s, gathered in a
//! [`ServiceContext`]. Each session keeps a reference to the context of the
//! service that owns it, so the two ends of one pipe can be configured
//! independently.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vpipe::{NoopHandler, PipeAcceptor, PipeAddress, PipeConnector, PipeHub};
//!
//! let hub = PipeHub::new();
//! let acceptor = PipeAcceptor::builder(Arc::new(NoopHandler)).build(&hub);
//! acceptor.bind(PipeAddress::new(1)).unwrap();
//!
//! let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);
//! let future = connector.connect(&PipeAddress::new(1));
//! assert!(future.is_connected());
//! ```

mod acceptor;
mod bootstrap;
mod connector;
mod listener;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use acceptor::{AcceptorBuilder, PipeAcceptor};
pub use connector::{ConnectorBuilder, PipeConnector};
pub use listener::ServiceListener;

pub(crate) use listener::ServiceListeners;

use crate::config::SessionConfig;
use crate::handler::IoHandler;
use crate::pipeline::{Filter, PipelineTemplate};
use crate::session::PipeSession;

/// Which side of a pipe a service sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Accepts connections at bound addresses.
    Acceptor,
    /// Initiates connections.
    Connector,
}

/// Shared state of one acceptor or connector.
pub struct ServiceContext {
    kind: ServiceKind,
    handler: Arc<dyn IoHandler>,
    template: PipelineTemplate,
    session_config: SessionConfig,
    listeners: ServiceListeners,
    disposed: AtomicBool,
}

impl ServiceContext {
    pub(crate) fn new(kind: ServiceKind, parts: ServiceParts) -> Arc<Self> {
        Arc::new(Self {
            kind,
            handler: parts.handler,
            template: parts.template,
            session_config: parts.session_config,
            listeners: ServiceListeners::new(parts.listeners),
            disposed: AtomicBool::new(false),
        })
    }

    /// Acceptor or connector.
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// The handler receiving this service's session events.
    pub fn handler(&self) -> &dyn IoHandler {
        self.handler.as_ref()
    }

    /// The template each new session's pipeline is built from.
    pub fn pipeline_template(&self) -> &PipelineTemplate {
        &self.template
    }

    /// Session settings.
    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    /// Sessions currently managed by this service, ordered by id.
    pub fn managed_sessions(&self) -> Vec<PipeSession> {
        self.listeners.managed_sessions()
    }

    /// Number of managed sessions.
    pub fn managed_session_count(&self) -> usize {
        self.listeners.managed_count()
    }

    /// Whether the service has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn listeners(&self) -> &ServiceListeners {
        &self.listeners
    }

    /// Mark disposed and close every managed session.
    ///
    /// Returns false if already disposed.
    pub(crate) fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        for session in self.managed_sessions() {
            session.close();
        }
        true
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("kind", &self.kind)
            .field("pipeline", &self.template)
            .field("managed", &self.managed_session_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Builder state common to acceptors and connectors.
pub(crate) struct ServiceParts {
    handler: Arc<dyn IoHandler>,
    template: PipelineTemplate,
    session_config: SessionConfig,
    listeners: Vec<Arc<dyn ServiceListener>>,
}

impl ServiceParts {
    pub(crate) fn new(handler: Arc<dyn IoHandler>) -> Self {
        Self {
            handler,
            template: PipelineTemplate::new(),
            session_config: SessionConfig::default(),
            listeners: Vec::new(),
        }
    }

    pub(crate) fn filter<F: Filter>(&mut self, name: &str, filter: F) {
        self.template.add_last(name, filter);
    }

    pub(crate) fn pipeline(&mut self, template: PipelineTemplate) {
        self.template = template;
    }

    pub(crate) fn session_config(&mut self, config: SessionConfig) {
        self.session_config = config;
    }

    pub(crate) fn listener(&mut self, listener: Arc<dyn ServiceListener>) {
        self.listeners.push(listener);
    }
}
