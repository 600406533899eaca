//! One end of a virtual pipe.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::idle::IdleStatus;
use super::table::SessionTable;
use crate::address::PipeAddress;
use crate::error::{Result, VpipeError};
use crate::future::CloseFuture;
use crate::handler::IoHandler;
use crate::pipeline::{Pipeline, PipelineEvent};
use crate::service::ServiceContext;

/// Identifier of a session in its hub's session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bootstrap progress of a session.
///
/// Closing is tracked separately: a session can be closed in any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    /// Constructed, pipeline not built yet.
    Created,
    /// Filters instantiated from the service template.
    PipelineBuilt,
    /// "Session created" delivered and idle supervision registered.
    Notified,
    /// Pipeline delivering events to the handler.
    Started,
}

/// Read/write timestamps used for idle detection.
pub(crate) struct ActivityClock {
    pub(crate) created: Instant,
    pub(crate) last_read: Instant,
    pub(crate) last_write: Instant,
    /// Last idle notification per [`IdleStatus`].
    pub(crate) last_idle: [Instant; 3],
}

impl ActivityClock {
    fn new(now: Instant) -> Self {
        Self {
            created: now,
            last_read: now,
            last_write: now,
            last_idle: [now; 3],
        }
    }
}

struct SessionShared {
    id: SessionId,
    peer_id: SessionId,
    local_address: PipeAddress,
    remote_address: PipeAddress,
    service: Arc<ServiceContext>,
    pipeline: Pipeline,
    phase: Mutex<SessionPhase>,
    closed: AtomicBool,
    close_future: CloseFuture,
    activity: Mutex<ActivityClock>,
    attributes: Mutex<HashMap<String, serde_json::Value>>,
    table: Weak<SessionTable>,
}

/// Handle to one end of a virtual pipe.
///
/// Cheap to clone; all clones refer to the same session. The peer is found
/// by id through the hub's session table, so the two ends never own each
/// other.
#[derive(Clone)]
pub struct PipeSession {
    shared: Arc<SessionShared>,
}

impl PipeSession {
    pub(crate) fn new(
        id: SessionId,
        peer_id: SessionId,
        local_address: PipeAddress,
        remote_address: PipeAddress,
        service: Arc<ServiceContext>,
        table: &Arc<SessionTable>,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                id,
                peer_id,
                local_address,
                remote_address,
                service,
                pipeline: Pipeline::new(),
                phase: Mutex::new(SessionPhase::Created),
                closed: AtomicBool::new(false),
                close_future: CloseFuture::new(),
                activity: Mutex::new(ActivityClock::new(Instant::now())),
                attributes: Mutex::new(HashMap::new()),
                table: Arc::downgrade(table),
            }),
        }
    }

    /// Session id.
    #[inline]
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    /// Id of the other end.
    #[inline]
    pub fn peer_id(&self) -> SessionId {
        self.shared.peer_id
    }

    /// This end's address.
    #[inline]
    pub fn local_address(&self) -> PipeAddress {
        self.shared.local_address
    }

    /// The other end's address.
    #[inline]
    pub fn remote_address(&self) -> PipeAddress {
        self.shared.remote_address
    }

    /// The service that owns this session.
    pub fn service(&self) -> &ServiceContext {
        &self.shared.service
    }

    pub(crate) fn handler(&self) -> &dyn IoHandler {
        self.shared.service.handler()
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.shared.pipeline
    }

    /// Names of the filters installed in this session's pipeline.
    pub fn filter_names(&self) -> Vec<String> {
        self.shared.pipeline.filter_names()
    }

    /// Current bootstrap phase.
    pub fn phase(&self) -> SessionPhase {
        *self.shared.phase.lock()
    }

    /// Whether the pipeline has started delivering events.
    pub fn is_started(&self) -> bool {
        self.phase() == SessionPhase::Started
    }

    /// Whether the session is closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Move forward to `phase`. Never moves backwards.
    pub(crate) fn advance(&self, phase: SessionPhase) {
        let mut current = self.shared.phase.lock();
        if phase > *current {
            *current = phase;
        }
    }

    /// The other end, while it is open.
    pub fn peer(&self) -> Option<PipeSession> {
        self.shared
            .table
            .upgrade()
            .and_then(|table| table.get(self.shared.peer_id))
    }

    /// Creation time.
    pub fn creation_time(&self) -> Instant {
        self.shared.activity.lock().created
    }

    /// Time of the last message received.
    pub fn last_read_time(&self) -> Instant {
        self.shared.activity.lock().last_read
    }

    /// Time of the last message written.
    pub fn last_write_time(&self) -> Instant {
        self.shared.activity.lock().last_write
    }

    /// Send a message to the peer.
    ///
    /// The message runs through this session's filters (last to first), then
    /// is queued on the peer's pipeline. If the peer has not started yet the
    /// message is delivered right after its `session_opened`.
    pub fn write(&self, message: impl Into<Bytes>) -> Result<()> {
        if self.is_closed() {
            return Err(VpipeError::SessionClosed(self.id()));
        }
        let peer = self
            .peer()
            .filter(|peer| !peer.is_closed())
            .ok_or(VpipeError::SessionClosed(self.peer_id()))?;

        let message = match self.shared.pipeline.filter_write(self, message.into())? {
            Some(message) => message,
            None => return Ok(()),
        };

        let now = Instant::now();
        self.shared.activity.lock().last_write = now;
        peer.shared.activity.lock().last_read = now;

        peer.shared
            .pipeline
            .push(&peer, PipelineEvent::Received(message.clone()));
        self.shared.pipeline.push(self, PipelineEvent::Sent(message));
        Ok(())
    }

    /// Close this session and its peer.
    ///
    /// Idempotent. Returns the close future, already resolved.
    pub fn close(&self) -> CloseFuture {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return self.close_future();
        }

        tracing::debug!(
            session = %self.id(),
            local = %self.local_address(),
            remote = %self.remote_address(),
            "Closing session"
        );

        let peer = self.peer();
        if let Some(table) = self.shared.table.upgrade() {
            table.remove(self.id());
        }

        self.shared.pipeline.push(self, PipelineEvent::Closed);
        self.shared.service.listeners().fire_session_destroyed(self);

        // The peer closes first so it never outlives the release of this
        // end's address by a close listener.
        if let Some(peer) = peer {
            peer.close();
        }
        self.shared.close_future.set_closed();
        self.close_future()
    }

    /// Future resolved when the session closes.
    pub fn close_future(&self) -> CloseFuture {
        self.shared.close_future.clone()
    }

    /// Start delivering events.
    pub(crate) fn start(&self) {
        self.advance(SessionPhase::Started);
        self.shared.pipeline.start(self);
    }

    /// Queue an idle notification if `status` has been idle long enough.
    pub(crate) fn notify_idle_if_due(&self, status: IdleStatus, now: Instant) -> bool {
        let idle_time = match self.shared.service.session_config().idle_time(status) {
            Some(idle_time) => idle_time,
            None => return false,
        };
        if self.is_closed() || !self.is_started() {
            return false;
        }

        {
            let mut clock = self.shared.activity.lock();
            let last_activity = match status {
                IdleStatus::ReaderIdle => clock.last_read,
                IdleStatus::WriterIdle => clock.last_write,
                IdleStatus::BothIdle => clock.last_read.max(clock.last_write),
            };
            let since = last_activity.max(clock.last_idle[status.index()]);
            if now.saturating_duration_since(since) < idle_time {
                return false;
            }
            clock.last_idle[status.index()] = now;
        }

        self.shared.pipeline.push(self, PipelineEvent::Idle(status));
        true
    }

    /// Store a JSON-serializable attribute.
    pub fn set_attribute<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|e| VpipeError::Attribute(e.to_string()))?;
        self.shared
            .attributes
            .lock()
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Read an attribute, `Ok(None)` when absent.
    pub fn attribute<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let value = match self.shared.attributes.lock().get(key) {
            Some(value) => value.clone(),
            None => return Ok(None),
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| VpipeError::Attribute(format!("{}: {}", key, e)))
    }

    /// Remove an attribute, returning whether it was present.
    pub fn remove_attribute(&self, key: &str) -> bool {
        self.shared.attributes.lock().remove(key).is_some()
    }

    /// Whether an attribute is set.
    pub fn contains_attribute(&self, key: &str) -> bool {
        self.shared.attributes.lock().contains_key(key)
    }
}

impl PartialEq for PipeSession {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for PipeSession {}

impl fmt::Debug for PipeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeSession")
            .field("id", &self.shared.id)
            .field("peer", &self.shared.peer_id)
            .field("local", &self.shared.local_address)
            .field("remote", &self.shared.remote_address)
            .field("service", &self.shared.service.kind())
            .field("closed", &self.is_closed())
            .finish()
    }
}
