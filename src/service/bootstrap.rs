//! Pipeline bootstrap and the two-phase start barrier.
//!
//! A session is bootstrapped in two fallible-then-infallible steps:
//!
//! 1. build the pipeline from the owning service's template (may fail)
//! 2. announce the session to the service and the idle supervisor (cannot fail)
//!
//! Starting is deferred to [`StartBarrier::release`], which the connector
//! calls only after both ends of the pipe have been bootstrapped. That keeps
//! `session_opened` ahead of any `message_received` on both ends.

use crate::error::Result;
use crate::session::{IdleSupervisor, PipeSession, SessionPhase};

/// Build `session`'s pipeline and announce it.
pub(crate) fn bootstrap(session: &PipeSession, idle: &dyn IdleSupervisor) -> Result<()> {
    let filters = session.service().pipeline_template().instantiate()?;
    session.pipeline().install(filters);
    session.advance(SessionPhase::PipelineBuilt);

    // Nothing below may fail.
    session.service().listeners().fire_session_created(session);
    idle.add_session(session);
    session.advance(SessionPhase::Notified);

    // The service may have been disposed after its managed sessions were
    // snapshotted; this session would otherwise stay open under it.
    if session.service().is_disposed() {
        tracing::debug!("Service disposed during bootstrap, closing {}", session.id());
        session.close();
    }

    Ok(())
}

/// Holds bootstrapped sessions until every participant has arrived.
#[derive(Default)]
pub(crate) struct StartBarrier {
    arrived: Vec<PipeSession>,
}

impl StartBarrier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a session that has reached `Notified`.
    pub(crate) fn arrive(&mut self, session: PipeSession) {
        debug_assert_eq!(session.phase(), SessionPhase::Notified);
        self.arrived.push(session);
    }

    /// Start every arrived session, in arrival order.
    pub(crate) fn release(self) {
        for session in &self.arrived {
            session.start();
        }
    }
}
