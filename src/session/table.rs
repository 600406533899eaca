//! Shared table of open sessions, indexed by id.
//!
//! Sessions find their peer here instead of holding a reference to it. A
//! session is removed as soon as it closes, so peer lookups on a closed
//! connection come back empty.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::pipe_session::{PipeSession, SessionId};

/// Open sessions of one hub.
#[derive(Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<SessionId, PipeSession>>,
    next_id: AtomicU64,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh session id.
    pub(crate) fn next_id(&self) -> SessionId {
        SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub(crate) fn insert(&self, session: PipeSession) {
        self.sessions.write().insert(session.id(), session);
    }

    pub(crate) fn remove(&self, id: SessionId) -> Option<PipeSession> {
        self.sessions.write().remove(&id)
    }

    /// Look up an open session.
    pub fn get(&self, id: SessionId) -> Option<PipeSession> {
        self.sessions.read().get(&id).cloned()
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// All open sessions, ordered by id.
    pub fn snapshot(&self) -> Vec<PipeSession> {
        let mut sessions: Vec<_> = self.sessions.read().values().cloned().collect();
        sessions.sort_by_key(|s| s.id());
        sessions
    }
}

impl std::fmt::Debug for SessionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTable")
            .field("open", &self.len())
            .finish()
    }
}
