//! Per-session pipeline instance and event delivery.
//!
//! Events pushed before the pipeline starts are queued. [`Pipeline::start`]
//! delivers `session_opened` first and then drains the queue, so a handler
//! never sees a message before it has seen the session open.
//!
//! Delivery uses a single drainer at a time: whichever thread finds the queue
//! idle drains it, and pushes made while a drain is in progress (including
//! pushes from inside handler callbacks) are picked up by that drainer. No
//! lock is held while filters or handlers run.

use std::collections::VecDeque;
use std::sync::OnceLock;

use bytes::Bytes;
use parking_lot::Mutex;

use super::filter::NamedFilter;
use crate::error::Result;
use crate::session::{IdleStatus, PipeSession};

/// An event travelling through a session pipeline.
#[derive(Debug, Clone)]
pub(crate) enum PipelineEvent {
    Received(Bytes),
    Sent(Bytes),
    Idle(IdleStatus),
    Closed,
}

#[derive(Default)]
struct ChainState {
    queue: VecDeque<PipelineEvent>,
    started: bool,
    draining: bool,
    /// A `Closed` event has been queued; later events are dropped.
    closing: bool,
}

/// The filter chain of one session.
#[derive(Default)]
pub(crate) struct Pipeline {
    filters: OnceLock<Vec<NamedFilter>>,
    state: Mutex<ChainState>,
}

impl Pipeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install the filters built from the service template.
    ///
    /// Returns false if filters were already installed.
    pub(crate) fn install(&self, filters: Vec<NamedFilter>) -> bool {
        self.filters.set(filters).is_ok()
    }

    pub(crate) fn filter_names(&self) -> Vec<String> {
        self.filters()
            .iter()
            .map(|f| f.name.clone())
            .collect()
    }

    fn filters(&self) -> &[NamedFilter] {
        self.filters.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Deliver "session created" to the handler, synchronously.
    pub(crate) fn fire_created(&self, session: &PipeSession) {
        session.handler().session_created(session);
    }

    /// Run an outbound message through the filters, last to first.
    pub(crate) fn filter_write(&self, session: &PipeSession, message: Bytes) -> Result<Option<Bytes>> {
        let mut message = message;
        for named in self.filters().iter().rev() {
            match named.filter.filter_write(session, message)? {
                Some(next) => message = next,
                None => return Ok(None),
            }
        }
        Ok(Some(message))
    }

    /// Queue an event and deliver it if the pipeline is started and idle.
    pub(crate) fn push(&self, session: &PipeSession, event: PipelineEvent) {
        {
            let mut state = self.state.lock();
            if state.closing {
                return;
            }
            if matches!(event, PipelineEvent::Closed) {
                state.closing = true;
            }
            state.queue.push_back(event);
            if !state.started || state.draining {
                return;
            }
            state.draining = true;
        }
        self.drain(session);
    }

    /// Enable delivery: `session_opened` first, then everything queued.
    pub(crate) fn start(&self, session: &PipeSession) {
        {
            let mut state = self.state.lock();
            if state.started {
                return;
            }
            state.started = true;
            state.draining = true;
        }

        for named in self.filters() {
            named.filter.session_opened(session);
        }
        session.handler().session_opened(session);

        self.drain(session);
    }

    fn drain(&self, session: &PipeSession) {
        loop {
            let event = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            self.dispatch(session, event);
        }
    }

    fn dispatch(&self, session: &PipeSession, event: PipelineEvent) {
        let handler = session.handler();
        match event {
            PipelineEvent::Received(message) => {
                let mut message = message;
                for named in self.filters() {
                    match named.filter.message_received(session, message) {
                        Ok(Some(next)) => message = next,
                        Ok(None) => return,
                        Err(e) => {
                            tracing::debug!(
                                "Filter {} failed on session {}: {}",
                                named.name,
                                session.id(),
                                e
                            );
                            handler.exception_caught(session, &e);
                            return;
                        }
                    }
                }
                handler.message_received(session, message);
            }
            PipelineEvent::Sent(message) => handler.message_sent(session, &message),
            PipelineEvent::Idle(status) => handler.session_idle(session, status),
            PipelineEvent::Closed => {
                for named in self.filters() {
                    named.filter.session_closed(session);
                }
                handler.session_closed(session);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }
}
