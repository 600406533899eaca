//! Sink for errors that have no caller to report to.
//!
//! Remote-side bootstrap failures happen on the connecting thread but belong
//! to the acceptor, so they cannot fail the connect. They are handed to the
//! hub's [`ExceptionMonitor`] instead.

use crate::error::VpipeError;

/// Observer for unexpected errors.
pub trait ExceptionMonitor: Send + Sync + 'static {
    /// Report an error that could not be delivered anywhere else.
    fn exception_caught(&self, error: &VpipeError);
}

/// Default monitor: logs the error at `warn` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExceptionMonitor;

impl ExceptionMonitor for TracingExceptionMonitor {
    fn exception_caught(&self, error: &VpipeError) {
        tracing::warn!(error = %error, "Unexpected exception");
    }
}
