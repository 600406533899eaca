//! Connector side: opens pipes to bound acceptors.
//!
//! A connect runs synchronously on the calling thread:
//! 1. Look up the acceptor bound at the target address
//! 2. Allocate an ephemeral local address
//! 3. Build the session pair and register it in the hub's session table
//! 4. Bootstrap the local session, then the remote one
//! 5. Start both pipelines and resolve the [`ConnectFuture`]
//!
//! The local address goes back to the allocator when the local session
//! closes, whichever way that happens.

use std::sync::Arc;

use super::bootstrap::{bootstrap, StartBarrier};
use super::{ServiceContext, ServiceKind, ServiceListener, ServiceParts};
use crate::address::PipeAddress;
use crate::config::SessionConfig;
use crate::error::VpipeError;
use crate::future::ConnectFuture;
use crate::handler::IoHandler;
use crate::hub::PipeHub;
use crate::pipeline::{Filter, PipelineTemplate};
use crate::session::{pair, PipeSession};

/// Builder for a [`PipeConnector`].
pub struct ConnectorBuilder {
    parts: ServiceParts,
}

impl ConnectorBuilder {
    /// Start a builder around `handler`.
    pub fn new(handler: Arc<dyn IoHandler>) -> Self {
        Self {
            parts: ServiceParts::new(handler),
        }
    }

    /// Append a filter shared by every connected session.
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

    /// Build the connector on `hub`.
    pub fn build(self, hub: &PipeHub) -> PipeConnector {
        PipeConnector {
            hub: hub.clone(),
            service: ServiceContext::new(ServiceKind::Connector, self.parts),
        }
    }
}

/// Opens virtual pipe connections to acceptors on the same hub.
pub struct PipeConnector {
    hub: PipeHub,
    service: Arc<ServiceContext>,
}

impl PipeConnector {
    /// Create a builder.
    pub fn builder(handler: Arc<dyn IoHandler>) -> ConnectorBuilder {
        ConnectorBuilder::new(handler)
    }

    /// Connect to the acceptor bound at `address`.
    ///
    /// The returned future is already resolved when this returns: either
    /// with the local session, both ends started, or with the error that
    /// aborted the attempt.
    pub fn connect(&self, address: &PipeAddress) -> ConnectFuture {
        self.connect_with(address, |_| {})
    }

    /// Connect, running `initializer` on the local session before its
    /// pipeline is built.
    ///
    /// Attributes set by the initializer are visible to every filter and
    /// handler callback of the session.
    pub fn connect_with<F>(&self, address: &PipeAddress, initializer: F) -> ConnectFuture
    where
        F: FnOnce(&PipeSession),
    {
        if self.service.is_disposed() {
            return ConnectFuture::failed(VpipeError::ServiceDisposed);
        }

        let entry = match self.hub.registry().lookup(address) {
            Some(entry) if !entry.service().is_disposed() => entry,
            _ => {
                tracing::debug!("No acceptor bound at {}", address);
                return ConnectFuture::failed(VpipeError::EndpointUnavailable(*address));
            }
        };

        let future = ConnectFuture::pending();

        let allocator = Arc::clone(self.hub.allocator());
        let local_address = match allocator.allocate() {
            Ok(local_address) => local_address,
            Err(e) => {
                future.fail(e);
                return future;
            }
        };

        let table = self.hub.session_table();
        let (local, remote) = pair(&entry, local_address, &self.service, table);

        // Registered before anything can close the session.
        local.close_future().add_listener(move || {
            allocator.release(local_address);
        });

        initializer(&local);

        let idle = self.hub.idle_supervisor();
        let mut barrier = StartBarrier::new();

        if let Err(e) = bootstrap(&local, idle) {
            tracing::debug!("Local bootstrap failed for {}: {}", local.id(), e);
            future.fail(VpipeError::LocalBootstrap(Box::new(e)));
            local.close();
            return future;
        }
        barrier.arrive(local.clone());

        // A handler may already have closed the pipe from session_created.
        if !remote.is_closed() {
            match bootstrap(&remote, idle) {
                Ok(()) => barrier.arrive(remote.clone()),
                Err(e) => {
                    self.hub
                        .exception_monitor()
                        .exception_caught(&VpipeError::RemoteBootstrap(Box::new(e)));
                    remote.close();
                }
            }
        }

        barrier.release();

        tracing::debug!(
            local = %local_address,
            remote = %address,
            session = %local.id(),
            "Connected"
        );
        future.complete(local);
        future
    }

    /// Open sessions created by this connector.
    pub fn managed_sessions(&self) -> Vec<PipeSession> {
        self.service.managed_sessions()
    }

    /// The connector's shared service state.
    pub fn service(&self) -> &Arc<ServiceContext> {
        &self.service
    }

    /// Close every session and refuse further connects.
    pub fn dispose(&self) {
        if self.service.dispose() {
            tracing::debug!("Connector disposed");
        }
    }
}

impl std::fmt::Debug for PipeConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeConnector")
            .field("service", &self.service)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::handler::NoopHandler;
    use crate::session::SessionPhase;
    use bytes::Bytes;

    struct Passthrough;

    impl Filter for Passthrough {}

    fn failing_template() -> PipelineTemplate {
        let mut template = PipelineTemplate::new();
        template.add_last_with("bad", || -> Result<Arc<dyn Filter>> {
            Err(VpipeError::Filter("boom".to_string()))
        });
        template
    }

    #[test]
    fn test_connect_unbound_address() {
        let hub = PipeHub::new();
        let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);

        let future = connector.connect(&PipeAddress::new(42));
        assert!(future.is_done());
        assert_eq!(
            future.error(),
            Some(VpipeError::EndpointUnavailable(PipeAddress::new(42)))
        );
        assert_eq!(hub.allocator().taken_count(), 0);
        assert_eq!(hub.session_count(), 0);
    }

    #[test]
    fn test_connect_pairs_sessions() {
        let hub = PipeHub::new();
        let acceptor = PipeAcceptorFixture::bind(&hub, 7);
        let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);

        let local = connector.connect(&PipeAddress::new(7)).session().unwrap();
        let remote = local.peer().unwrap();

        assert_eq!(local.local_address(), PipeAddress::new(-1));
        assert_eq!(local.remote_address(), PipeAddress::new(7));
        assert_eq!(remote.local_address(), PipeAddress::new(7));
        assert_eq!(remote.remote_address(), PipeAddress::new(-1));
        assert_eq!(remote.peer_id(), local.id());
        assert_eq!(local.phase(), SessionPhase::Started);
        assert_eq!(remote.phase(), SessionPhase::Started);
        assert_eq!(acceptor.0.managed_sessions(), vec![remote]);
        assert_eq!(connector.managed_sessions(), vec![local]);
    }

    #[test]
    fn test_close_releases_local_address() {
        let hub = PipeHub::new();
        let _acceptor = PipeAcceptorFixture::bind(&hub, 1);
        let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);

        let local = connector.connect(&PipeAddress::new(1)).session().unwrap();
        assert!(hub.allocator().is_taken(local.local_address()));

        local.close();
        assert!(!hub.allocator().is_taken(local.local_address()));
        assert_eq!(hub.session_count(), 0);
    }

    #[test]
    fn test_local_bootstrap_failure() {
        let hub = PipeHub::new();
        let acceptor = PipeAcceptorFixture::bind(&hub, 1);
        let connector = PipeConnector::builder(Arc::new(NoopHandler))
            .pipeline(failing_template())
            .build(&hub);

        let future = connector.connect(&PipeAddress::new(1));
        assert!(matches!(
            future.error(),
            Some(VpipeError::LocalBootstrap(inner)) if *inner == VpipeError::Filter("boom".into())
        ));
        assert_eq!(hub.allocator().taken_count(), 0);
        assert_eq!(hub.session_count(), 0);
        assert!(acceptor.0.managed_sessions().is_empty());
    }

    #[test]
    fn test_remote_bootstrap_failure_still_connects() {
        let hub = PipeHub::new();
        let acceptor = crate::service::PipeAcceptor::builder(Arc::new(NoopHandler))
            .pipeline(failing_template())
            .build(&hub);
        acceptor.bind(PipeAddress::new(1)).unwrap();
        let connector = PipeConnector::builder(Arc::new(NoopHandler))
            .filter("pass", Passthrough)
            .build(&hub);

        let future = connector.connect(&PipeAddress::new(1));
        let local = future.session().unwrap();

        assert!(local.is_closed());
        assert_eq!(local.filter_names(), vec!["pass".to_string()]);
        assert!(acceptor.managed_sessions().is_empty());
        assert_eq!(hub.allocator().taken_count(), 0);
        assert!(local.write(Bytes::from_static(b"x")).is_err());
    }

    #[test]
    fn test_initializer_runs_before_bootstrap() {
        let hub = PipeHub::new();
        let _acceptor = PipeAcceptorFixture::bind(&hub, 1);
        let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);

        let future = connector.connect_with(&PipeAddress::new(1), |session| {
            assert_eq!(session.phase(), SessionPhase::Created);
            session.set_attribute("user", &"alice").unwrap();
        });
        let local = future.session().unwrap();
        assert_eq!(local.attribute::<String>("user").unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn test_dispose_closes_and_refuses() {
        let hub = PipeHub::new();
        let _acceptor = PipeAcceptorFixture::bind(&hub, 1);
        let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);
        let local = connector.connect(&PipeAddress::new(1)).session().unwrap();

        connector.dispose();
        assert!(local.is_closed());
        assert_eq!(
            connector.connect(&PipeAddress::new(1)).error(),
            Some(VpipeError::ServiceDisposed)
        );
    }

    #[test]
    fn test_connect_to_disposed_acceptor() {
        let hub = PipeHub::new();
        let acceptor = PipeAcceptorFixture::bind(&hub, 1);
        let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);

        acceptor.0.dispose();
        assert_eq!(
            connector.connect(&PipeAddress::new(1)).error(),
            Some(VpipeError::EndpointUnavailable(PipeAddress::new(1)))
        );
    }

    struct PipeAcceptorFixture(crate::service::PipeAcceptor);

    impl PipeAcceptorFixture {
        fn bind(hub: &PipeHub, port: i32) -> Self {
            let acceptor = crate::service::PipeAcceptor::builder(Arc::new(NoopHandler)).build(hub);
            acceptor.bind(PipeAddress::new(port)).unwrap();
            Self(acceptor)
        }
    }
}
