//! Application-facing session event handler.
//!
//! Every method has a default, so a handler only overrides what it needs.
//! Callbacks run synchronously on whichever thread triggered the event
//! (the connecting thread, the writing peer, or the idle checker). They may
//! write to sessions or close them; those calls never block on delivery.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use vpipe::{IoHandler, PipeSession};
//!
//! struct Echo;
//!
//! impl IoHandler for Echo {
//!     fn message_received(&self, session: &PipeSession, message: Bytes) {
//!         let _ = session.write(message);
//!     }
//! }
//! ```

use bytes::Bytes;

use crate::error::VpipeError;
use crate::session::{IdleStatus, PipeSession};

/// Receives lifecycle and message events for the sessions of one service.
pub trait IoHandler: Send + Sync + 'static {
    /// The session exists and its pipeline is built. No message has been
    /// delivered yet.
    fn session_created(&self, _session: &PipeSession) {}

    /// The pipeline started. Always delivered before any `message_received`.
    fn session_opened(&self, _session: &PipeSession) {}

    /// A message written by the peer arrived.
    fn message_received(&self, _session: &PipeSession, _message: Bytes) {}

    /// A message written on this session was handed to the peer.
    fn message_sent(&self, _session: &PipeSession, _message: &Bytes) {}

    /// The session has been idle for the configured time.
    fn session_idle(&self, _session: &PipeSession, _status: IdleStatus) {}

    /// The session closed. Last event delivered for a session.
    fn session_closed(&self, _session: &PipeSession) {}

    /// A filter failed while processing an inbound message.
    fn exception_caught(&self, session: &PipeSession, error: &VpipeError) {
        tracing::warn!("Unhandled error on session {}: {}", session.id(), error);
    }
}

/// Handler that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl IoHandler for NoopHandler {}
