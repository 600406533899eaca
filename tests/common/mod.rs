//! Shared test fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use vpipe::{
    ExceptionMonitor, IdleStatus, IoHandler, PipeSession, ServiceListener, VpipeError,
};

/// A handler callback as seen by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Created,
    Opened,
    Received(Vec<u8>),
    Sent(Vec<u8>),
    Idle(IdleStatus),
    Closed,
    Exception(VpipeError),
}

type Hook = Box<dyn Fn(&PipeSession) + Send + Sync>;

/// Handler that records every callback in order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    on_created: Option<Hook>,
    on_opened: Option<Hook>,
    echo: bool,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Write every received message back.
    pub fn echo() -> Arc<Self> {
        Arc::new(Self {
            echo: true,
            ..Self::default()
        })
    }

    /// Run `hook` from `session_created`.
    pub fn on_created<F>(hook: F) -> Arc<Self>
    where
        F: Fn(&PipeSession) + Send + Sync + 'static,
    {
        Arc::new(Self {
            on_created: Some(Box::new(hook)),
            ..Self::default()
        })
    }

    /// Run `hook` from `session_opened`.
    pub fn on_opened<F>(hook: F) -> Arc<Self>
    where
        F: Fn(&PipeSession) + Send + Sync + 'static,
    {
        Arc::new(Self {
            on_opened: Some(Box::new(hook)),
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Events without the `Sent` notifications.
    pub fn inbound(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Event::Sent(_)))
            .collect()
    }

    pub fn received(&self) -> Vec<Vec<u8>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Received(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl IoHandler for Recorder {
    fn session_created(&self, session: &PipeSession) {
        self.push(Event::Created);
        if let Some(hook) = &self.on_created {
            hook(session);
        }
    }

    fn session_opened(&self, session: &PipeSession) {
        self.push(Event::Opened);
        if let Some(hook) = &self.on_opened {
            hook(session);
        }
    }

    fn message_received(&self, session: &PipeSession, message: Bytes) {
        self.push(Event::Received(message.to_vec()));
        if self.echo {
            let _ = session.write(message);
        }
    }

    fn message_sent(&self, _session: &PipeSession, message: &Bytes) {
        self.push(Event::Sent(message.to_vec()));
    }

    fn session_idle(&self, _session: &PipeSession, status: IdleStatus) {
        self.push(Event::Idle(status));
    }

    fn session_closed(&self, _session: &PipeSession) {
        self.push(Event::Closed);
    }

    fn exception_caught(&self, _session: &PipeSession, error: &VpipeError) {
        self.push(Event::Exception(error.clone()));
    }
}

/// Exception monitor that keeps what it is given.
#[derive(Default)]
pub struct MonitorLog {
    errors: Mutex<Vec<VpipeError>>,
}

impl MonitorLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn errors(&self) -> Vec<VpipeError> {
        self.errors.lock().clone()
    }
}

impl ExceptionMonitor for MonitorLog {
    fn exception_caught(&self, error: &VpipeError) {
        self.errors.lock().push(error.clone());
    }
}

/// Service listener counting notifications.
#[derive(Default)]
pub struct ListenerLog {
    created: Mutex<Vec<u64>>,
    destroyed: Mutex<Vec<u64>>,
}

impl ListenerLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> Vec<u64> {
        self.created.lock().clone()
    }

    pub fn destroyed(&self) -> Vec<u64> {
        self.destroyed.lock().clone()
    }
}

impl ServiceListener for ListenerLog {
    fn session_created(&self, session: &PipeSession) {
        self.created.lock().push(session.id().get());
    }

    fn session_destroyed(&self, session: &PipeSession) {
        self.destroyed.lock().push(session.id().get());
    }
}

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
