//! # vpipe
//!
//! In-process virtual pipe transport.
//!
//! Acceptors bind integer [`PipeAddress`]es on a [`PipeHub`]; connectors on
//! the same hub connect to them without touching the network. Each connect
//! produces a pair of linked [`PipeSession`]s: writing on one end delivers
//! the message to the other end's filters and handler.
//!
//! ## Architecture
//!
//! - **Transport**: endpoint registry and ephemeral local address allocator
//! - **Session**: paired sessions, session table, idle detection
//! - **Pipeline**: per-session filter chains built from a service template
//! - **Service**: acceptors and connectors, bootstrap and service listeners
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use vpipe::{IoHandler, NoopHandler, PipeAcceptor, PipeAddress, PipeConnector, PipeHub, PipeSession};
//!
//! struct Echo;
//!
//! impl IoHandler for Echo {
//!     fn message_received(&self, session: &PipeSession, message: Bytes) {
//!         let _ = session.write(message);
//!     }
//! }
//!
//! let hub = PipeHub::new();
//! let acceptor = PipeAcceptor::builder(Arc::new(Echo)).build(&hub);
//! acceptor.bind(PipeAddress::new(8080)).unwrap();
//!
//! let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);
//! let session = connector
//!     .connect(&PipeAddress::new(8080))
//!     .session()
//!     .unwrap();
//!
//! session.write(Bytes::from_static(b"ping")).unwrap();
//! session.close();
//! assert_eq!(hub.session_count(), 0);
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod future;
pub mod handler;
pub mod hub;
pub mod monitor;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod transport;

pub use address::PipeAddress;
pub use error::{Result, VpipeError};
pub use future::{CloseFuture, ConnectFuture, IoFuture};
pub use handler::{IoHandler, NoopHandler};
pub use hub::{HubBuilder, PipeHub};
pub use monitor::{ExceptionMonitor, TracingExceptionMonitor};
pub use pipeline::{Filter, PipelineTemplate};
pub use service::{PipeAcceptor, PipeConnector, ServiceListener};
pub use session::{IdleStatus, PipeSession, SessionId, SessionPhase};
