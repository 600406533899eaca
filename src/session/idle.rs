//! Idle detection.
//!
//! The [`IdleChecker`] keeps every registered session and, on each
//! [`check`](IdleChecker::check), queues an idle event on sessions whose
//! reader, writer or both directions have been quiet for longer than their
//! service's [`SessionConfig`](crate::config::SessionConfig) allows. Run it
//! periodically with [`IdleChecker::spawn`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::pipe_session::{PipeSession, SessionId};

/// Kind of inactivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleStatus {
    /// Nothing received.
    ReaderIdle,
    /// Nothing written.
    WriterIdle,
    /// Neither received nor written.
    BothIdle,
}

impl IdleStatus {
    /// All statuses, in check order.
    pub const ALL: [IdleStatus; 3] = [
        IdleStatus::ReaderIdle,
        IdleStatus::WriterIdle,
        IdleStatus::BothIdle,
    ];

    pub(crate) const fn index(self) -> usize {
        match self {
            IdleStatus::ReaderIdle => 0,
            IdleStatus::WriterIdle => 1,
            IdleStatus::BothIdle => 2,
        }
    }
}

/// Accepts sessions for idle supervision.
pub trait IdleSupervisor: Send + Sync + 'static {
    /// Start watching `session`. Must not fail.
    fn add_session(&self, session: &PipeSession);
}

/// Default [`IdleSupervisor`].
#[derive(Default)]
pub struct IdleChecker {
    /// Shared with each session's close listener, which holds it weakly.
    sessions: Arc<Mutex<HashMap<SessionId, PipeSession>>>,
}

impl IdleChecker {
    /// Create an empty checker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions being watched.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no session is watched.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Drop closed sessions and fire due idle events.
    ///
    /// Returns the number of idle events queued.
    pub fn check(&self, now: Instant) -> usize {
        let sessions: Vec<PipeSession> = {
            let mut sessions = self.sessions.lock();
            sessions.retain(|_, session| !session.is_closed());
            sessions.values().cloned().collect()
        };

        let mut fired = 0;
        for session in &sessions {
            for status in IdleStatus::ALL {
                if session.notify_idle_if_due(status, now) {
                    fired += 1;
                }
            }
        }
        fired
    }

    /// Run [`check`](Self::check) every `period` on the current tokio runtime.
    ///
    /// The task ends once the checker is dropped; abort the handle to stop it
    /// earlier.
    pub fn spawn(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let checker = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(checker) = checker.upgrade() else {
                    break;
                };
                let fired = checker.check(Instant::now());
                if fired > 0 {
                    tracing::trace!("Idle checker fired {} events", fired);
                }
            }
        })
    }
}

impl IdleSupervisor for IdleChecker {
    fn add_session(&self, session: &PipeSession) {
        let id = session.id();
        self.sessions.lock().insert(id, session.clone());

        // Runs immediately if the session is already closed.
        let sessions = Arc::downgrade(&self.sessions);
        session.close_future().add_listener(move || {
            if let Some(sessions) = sessions.upgrade() {
                sessions.lock().remove(&id);
            }
        });
    }
}

impl std::fmt::Debug for IdleChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleChecker")
            .field("sessions", &self.len())
            .finish()
    }
}
