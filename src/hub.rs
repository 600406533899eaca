//! The hub: process-wide state shared by the services attached to it.
//!
//! A [`PipeHub`] owns the endpoint registry, the local address allocator,
//! the session table and the idle checker. Acceptors and connectors built on
//! the same hub can reach each other; separate hubs are fully isolated,
//! which keeps tests independent.
//!
//! # Example
//!
//! ```
//! use vpipe::config::PipeConfig;
//! use vpipe::PipeHub;
//!
//! let hub = PipeHub::builder()
//!     .config(PipeConfig::default().allocator_capacity(64))
//!     .build()
//!     .unwrap();
//! assert_eq!(hub.allocator().capacity(), 64);
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::PipeConfig;
use crate::error::Result;
use crate::monitor::{ExceptionMonitor, TracingExceptionMonitor};
use crate::session::{IdleChecker, IdleSupervisor, PipeSession, SessionTable};
use crate::transport::{EndpointRegistry, LocalAddressAllocator};

struct HubInner {
    config: PipeConfig,
    registry: EndpointRegistry,
    allocator: Arc<LocalAddressAllocator>,
    sessions: Arc<SessionTable>,
    idle_checker: Arc<IdleChecker>,
    idle_supervisor: Arc<dyn IdleSupervisor>,
    exception_monitor: Arc<dyn ExceptionMonitor>,
}

/// Shared transport state. Cheap to clone.
#[derive(Clone)]
pub struct PipeHub {
    inner: Arc<HubInner>,
}

impl PipeHub {
    /// Create a hub with the default configuration.
    pub fn new() -> Self {
        HubBuilder::new().assemble(PipeConfig::default())
    }

    /// Create a builder.
    pub fn builder() -> HubBuilder {
        HubBuilder::new()
    }

    /// Hub configuration.
    pub fn config(&self) -> &PipeConfig {
        &self.inner.config
    }

    /// Addresses bound by acceptors.
    pub fn registry(&self) -> &EndpointRegistry {
        &self.inner.registry
    }

    /// Allocator for connector-side addresses.
    pub fn allocator(&self) -> &Arc<LocalAddressAllocator> {
        &self.inner.allocator
    }

    pub(crate) fn session_table(&self) -> &Arc<SessionTable> {
        &self.inner.sessions
    }

    /// Every open session on the hub, both ends, ordered by id.
    pub fn sessions(&self) -> Vec<PipeSession> {
        self.inner.sessions.snapshot()
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// The built-in idle checker.
    pub fn idle_checker(&self) -> &Arc<IdleChecker> {
        &self.inner.idle_checker
    }

    /// Where bootstrapped sessions are registered for idle supervision.
    pub fn idle_supervisor(&self) -> &dyn IdleSupervisor {
        self.inner.idle_supervisor.as_ref()
    }

    /// Where errors without a caller end up.
    pub fn exception_monitor(&self) -> &dyn ExceptionMonitor {
        self.inner.exception_monitor.as_ref()
    }

    /// Run the built-in idle checker at the configured interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_idle_checker(&self) -> JoinHandle<()> {
        let period = self.inner.config.idle_check_period();
        tracing::debug!("Starting idle checker every {:?}", period);
        self.inner.idle_checker.spawn(period)
    }

    /// Close every open session.
    pub fn close_all_sessions(&self) {
        for session in self.sessions() {
            session.close();
        }
    }
}

impl Default for PipeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PipeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeHub")
            .field("config", &self.inner.config)
            .field("bound", &self.inner.registry.bound_addresses())
            .field("sessions", &self.session_count())
            .finish()
    }
}

/// Builder for a [`PipeHub`].
#[derive(Default)]
pub struct HubBuilder {
    config: PipeConfig,
    idle_supervisor: Option<Arc<dyn IdleSupervisor>>,
    exception_monitor: Option<Arc<dyn ExceptionMonitor>>,
}

impl HubBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hub configuration.
    pub fn config(mut self, config: PipeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the idle supervisor. The built-in checker is still created
    /// but receives no sessions.
    pub fn idle_supervisor(mut self, supervisor: Arc<dyn IdleSupervisor>) -> Self {
        self.idle_supervisor = Some(supervisor);
        self
    }

    /// Replace the exception monitor. Default: [`TracingExceptionMonitor`].
    pub fn exception_monitor(mut self, monitor: Arc<dyn ExceptionMonitor>) -> Self {
        self.exception_monitor = Some(monitor);
        self
    }

    /// Validate the configuration and build the hub.
    pub fn build(mut self) -> Result<PipeHub> {
        let config = std::mem::take(&mut self.config);
        config.validate()?;
        Ok(self.assemble(config))
    }

    fn assemble(self, config: PipeConfig) -> PipeHub {
        let idle_checker = Arc::new(IdleChecker::new());
        let idle_supervisor = self
            .idle_supervisor
            .unwrap_or_else(|| Arc::clone(&idle_checker) as Arc<dyn IdleSupervisor>);
        let exception_monitor = self
            .exception_monitor
            .unwrap_or_else(|| Arc::new(TracingExceptionMonitor) as Arc<dyn ExceptionMonitor>);

        PipeHub {
            inner: Arc::new(HubInner {
                allocator: Arc::new(LocalAddressAllocator::with_capacity(
                    config.allocator_capacity,
                )),
                config,
                registry: EndpointRegistry::new(),
                sessions: Arc::new(SessionTable::new()),
                idle_checker,
                idle_supervisor,
                exception_monitor,
            }),
        }
    }
}
