//! Single-assignment, listenable result handles.
//!
//! An [`IoFuture`] is written once and read any number of times. Listeners
//! added before the value is set run on the thread that sets it; listeners
//! added afterwards run immediately on the thread that adds them. Async code
//! can `wait()` for the value instead.
//!
//! [`ConnectFuture`] and [`CloseFuture`] are the two handles the transport
//! hands out.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Result, VpipeError};
use crate::session::PipeSession;

type Listener<T> = Box<dyn FnOnce(&T) + Send>;

enum Slot<T> {
    Pending(Vec<Listener<T>>),
    Ready(T),
}

struct FutureInner<T> {
    slot: Mutex<Slot<T>>,
    notify: Notify,
}

/// A value that becomes available exactly once.
pub struct IoFuture<T> {
    inner: Arc<FutureInner<T>>,
}

impl<T> Clone for IoFuture<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> IoFuture<T> {
    /// Create an unresolved future.
    pub fn pending() -> Self {
        Self {
            inner: Arc::new(FutureInner {
                slot: Mutex::new(Slot::Pending(Vec::new())),
                notify: Notify::new(),
            }),
        }
    }

    /// Create an already-resolved future.
    pub fn ready(value: T) -> Self {
        Self {
            inner: Arc::new(FutureInner {
                slot: Mutex::new(Slot::Ready(value)),
                notify: Notify::new(),
            }),
        }
    }

    /// Resolve the future and run pending listeners.
    ///
    /// Returns false, leaving the first value in place, if already resolved.
    pub(crate) fn set(&self, value: T) -> bool {
        let snapshot = value.clone();
        let listeners = {
            let mut slot = self.inner.slot.lock();
            match &mut *slot {
                Slot::Ready(_) => return false,
                Slot::Pending(listeners) => {
                    let listeners = std::mem::take(listeners);
                    *slot = Slot::Ready(value);
                    listeners
                }
            }
        };

        self.inner.notify.notify_waiters();
        for listener in listeners {
            listener(&snapshot);
        }
        true
    }

    /// Run `listener` once the value is available.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let value = {
            let mut slot = self.inner.slot.lock();
            match &mut *slot {
                Slot::Pending(listeners) => {
                    listeners.push(Box::new(listener));
                    return;
                }
                Slot::Ready(value) => value.clone(),
            }
        };
        listener(&value);
    }

    /// Whether the value has been set.
    pub fn is_done(&self) -> bool {
        matches!(&*self.inner.slot.lock(), Slot::Ready(_))
    }

    /// The value, if set.
    pub fn get(&self) -> Option<T> {
        match &*self.inner.slot.lock() {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Pending(_) => None,
        }
    }

    /// Wait for the value.
    pub async fn wait(&self) -> T {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.get() {
                return value;
            }
            notified.await;
        }
    }
}

impl<T> fmt::Debug for IoFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let done = matches!(&*self.inner.slot.lock(), Slot::Ready(_));
        f.debug_struct("IoFuture").field("done", &done).finish()
    }
}

/// Outcome of a connect attempt.
///
/// Resolves to the connector-side session once both pipelines have started,
/// or to the error that aborted the attempt.
#[derive(Clone, Debug)]
pub struct ConnectFuture(IoFuture<Result<PipeSession>>);

impl ConnectFuture {
    pub(crate) fn pending() -> Self {
        Self(IoFuture::pending())
    }

    pub(crate) fn failed(error: VpipeError) -> Self {
        Self(IoFuture::ready(Err(error)))
    }

    /// Resolve with the connected session.
    pub(crate) fn complete(&self, session: PipeSession) -> bool {
        let id = session.id();
        let set = self.0.set(Ok(session));
        if !set {
            tracing::warn!("Connect future already resolved, dropping session {}", id);
        }
        set
    }

    /// Resolve with an error.
    pub(crate) fn fail(&self, error: VpipeError) -> bool {
        let set = self.0.set(Err(error));
        if !set {
            tracing::warn!("Connect future already resolved, dropping error");
        }
        set
    }

    /// Run `listener` with the outcome once known.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnOnce(&Result<PipeSession>) + Send + 'static,
    {
        self.0.add_listener(listener);
    }

    /// Whether the attempt has finished either way.
    pub fn is_done(&self) -> bool {
        self.0.is_done()
    }

    /// Whether the attempt finished successfully.
    pub fn is_connected(&self) -> bool {
        matches!(self.0.get(), Some(Ok(_)))
    }

    /// The connected session, if any.
    pub fn session(&self) -> Option<PipeSession> {
        self.0.get().and_then(|r| r.ok())
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<VpipeError> {
        self.0.get().and_then(|r| r.err())
    }

    /// Wait for the outcome.
    pub async fn await_session(&self) -> Result<PipeSession> {
        self.0.wait().await
    }
}

/// Resolves when a session closes.
#[derive(Clone, Debug)]
pub struct CloseFuture(IoFuture<()>);

impl CloseFuture {
    pub(crate) fn new() -> Self {
        Self(IoFuture::pending())
    }

    pub(crate) fn set_closed(&self) -> bool {
        self.0.set(())
    }

    /// Run `listener` once the session is closed.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.0.add_listener(move |_| listener());
    }

    /// Whether the session is closed.
    pub fn is_closed(&self) -> bool {
        self.0.is_done()
    }

    /// Wait for the session to close.
    pub async fn wait(&self) {
        self.0.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_listener_before_set() {
        let future: IoFuture<u32> = IoFuture::pending();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = seen.clone();
        future.add_listener(move |v| {
            seen_clone.store(*v as usize, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        assert!(future.set(7));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_listener_after_set_runs_immediately() {
        let future: IoFuture<u32> = IoFuture::pending();
        future.set(3);

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        future.add_listener(move |v| {
            seen_clone.store(*v as usize, Ordering::SeqCst);
        });

        // No waiting needed: the listener ran on this thread.
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_second_set_is_ignored() {
        let future: IoFuture<u32> = IoFuture::pending();
        assert!(future.set(1));
        assert!(!future.set(2));
        assert_eq!(future.get(), Some(1));
    }

    #[test]
    fn test_every_listener_runs_once() {
        let future: IoFuture<()> = IoFuture::pending();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let count = count.clone();
            future.add_listener(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        future.set(());
        future.set(());

        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_clone_shares_state() {
        let future: IoFuture<&'static str> = IoFuture::pending();
        let other = future.clone();

        future.set("done");
        assert!(other.is_done());
        assert_eq!(other.get(), Some("done"));
    }

    #[tokio::test]
    async fn test_wait_ready() {
        let future = IoFuture::ready(5u8);
        assert_eq!(future.wait().await, 5);
    }

    #[tokio::test]
    async fn test_wait_set_from_other_task() {
        let future: IoFuture<u64> = IoFuture::pending();
        let setter = future.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            setter.set(99);
        });

        let value = tokio::time::timeout(Duration::from_secs(1), future.wait())
            .await
            .unwrap();
        assert_eq!(value, 99);
    }

    #[test]
    fn test_connect_future_failed() {
        let future = ConnectFuture::failed(VpipeError::ServiceDisposed);

        assert!(future.is_done());
        assert!(!future.is_connected());
        assert!(future.session().is_none());
        assert_eq!(future.error(), Some(VpipeError::ServiceDisposed));

        let replayed = Arc::new(AtomicUsize::new(0));
        let replayed_clone = replayed.clone();
        future.add_listener(move |outcome| {
            assert!(outcome.is_err());
            replayed_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(replayed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connect_future_single_assignment() {
        let future = ConnectFuture::pending();
        assert!(!future.is_done());

        assert!(future.fail(VpipeError::ServiceDisposed));
        assert!(!future.fail(VpipeError::Config("late".into())));
        assert_eq!(future.error(), Some(VpipeError::ServiceDisposed));
    }

    #[tokio::test]
    async fn test_close_future() {
        let future = CloseFuture::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = fired.clone();
        future.add_listener(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!future.is_closed());
        assert!(future.set_closed());
        assert!(!future.set_closed());
        assert!(future.is_closed());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        future.wait().await;
    }
}
