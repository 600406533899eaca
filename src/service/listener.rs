//! Service-level session notifications and the managed session set.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::session::{PipeSession, SessionId};

/// Observes sessions as a service gains and loses them.
pub trait ServiceListener: Send + Sync + 'static {
    /// A session finished bootstrapping its pipeline.
    fn session_created(&self, _session: &PipeSession) {}

    /// A session that was created on this service closed.
    fn session_destroyed(&self, _session: &PipeSession) {}
}

/// Registered listeners plus the sessions they have been told about.
#[derive(Default)]
pub(crate) struct ServiceListeners {
    listeners: Vec<Arc<dyn ServiceListener>>,
    managed: RwLock<HashMap<SessionId, PipeSession>>,
}

impl ServiceListeners {
    pub(crate) fn new(listeners: Vec<Arc<dyn ServiceListener>>) -> Self {
        Self {
            listeners,
            managed: RwLock::new(HashMap::new()),
        }
    }

    /// Start managing `session` and deliver "session created" to the
    /// handler, then to every listener.
    pub(crate) fn fire_session_created(&self, session: &PipeSession) {
        self.managed.write().insert(session.id(), session.clone());

        session.pipeline().fire_created(session);
        for listener in &self.listeners {
            listener.session_created(session);
        }
    }

    /// Stop managing `session`. Listeners hear about it only if it was managed.
    pub(crate) fn fire_session_destroyed(&self, session: &PipeSession) {
        if self.managed.write().remove(&session.id()).is_none() {
            return;
        }
        for listener in &self.listeners {
            listener.session_destroyed(session);
        }
    }

    pub(crate) fn managed_sessions(&self) -> Vec<PipeSession> {
        let mut sessions: Vec<_> = self.managed.read().values().cloned().collect();
        sessions.sort_by_key(|s| s.id());
        sessions
    }

    pub(crate) fn managed_count(&self) -> usize {
        self.managed.read().len()
    }
}
