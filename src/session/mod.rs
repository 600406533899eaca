//! Session module - the two ends of a virtual pipe.
//!
//! Provides:
//! - [`PipeSession`] - one end of a connection, owning its pipeline
//! - [`SessionTable`] - open sessions by id; peers find each other here
//! - [`IdleChecker`] - periodic idle detection
//!
//! Sessions are created in pairs by the connector and move through
//! [`SessionPhase`]s `Created → PipelineBuilt → Notified → Started`. Closing
//! either end closes the other.

mod idle;
mod pair;
mod pipe_session;
mod table;

pub(crate) use pair::pair;
pub use idle::{IdleChecker, IdleStatus, IdleSupervisor};
pub use pipe_session::{PipeSession, SessionId, SessionPhase};
pub use table::SessionTable;
