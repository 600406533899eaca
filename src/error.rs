//! Error types for vpipe.

use thiserror::Error;

use crate::address::PipeAddress;
use crate::session::SessionId;

/// Main error type for all vpipe operations.
///
/// Errors are `Clone` because a single connect outcome may be replayed to
/// any number of [`ConnectFuture`](crate::ConnectFuture) listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VpipeError {
    /// No acceptor is bound at the requested address.
    #[error("Endpoint unavailable: {0}")]
    EndpointUnavailable(PipeAddress),

    /// Every local address in the allocator's pool is taken.
    #[error("Can't assign a local pipe address: all {capacity} addresses are taken")]
    AddressExhaustion { capacity: u64 },

    /// An acceptor is already bound at this address.
    #[error("Address already bound: {0}")]
    AddressInUse(PipeAddress),

    /// Acceptor addresses must be non-negative.
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(PipeAddress),

    /// Bootstrapping the connector-side session failed.
    #[error("Local session bootstrap failed: {0}")]
    LocalBootstrap(Box<VpipeError>),

    /// Bootstrapping the acceptor-side session failed.
    #[error("Remote session bootstrap failed: {0}")]
    RemoteBootstrap(Box<VpipeError>),

    /// Two filters in one pipeline template share a name.
    #[error("Duplicate filter name: {0}")]
    DuplicateFilter(String),

    /// A filter failed while building or processing an event.
    #[error("Filter error: {0}")]
    Filter(String),

    /// The session (or its peer) is already closed.
    #[error("Session closed: {0}")]
    SessionClosed(SessionId),

    /// The service has been disposed.
    #[error("Service disposed")]
    ServiceDisposed,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session attribute could not be encoded or decoded.
    #[error("Attribute error: {0}")]
    Attribute(String),
}

/// Result type alias using VpipeError.
pub type Result<T> = std::result::Result<T, VpipeError>;
