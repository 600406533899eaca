//! Pipeline module - per-session filter chains.
//!
//! Provides:
//! - [`Filter`] - a processing stage for inbound and outbound messages
//! - [`PipelineTemplate`] - the ordered filter list a service applies to each session
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use vpipe::pipeline::{Filter, PipelineTemplate};
//! use vpipe::{PipeSession, Result};
//!
//! struct Uppercase;
//!
//! impl Filter for Uppercase {
//!     fn message_received(&self, _session: &PipeSession, message: Bytes) -> Result<Option<Bytes>> {
//!         Ok(Some(Bytes::from(message.to_ascii_uppercase())))
//!     }
//! }
//!
//! let mut template = PipelineTemplate::new();
//! template.add_last("upper", Uppercase);
//! assert_eq!(template.names(), vec!["upper"]);
//! ```

mod chain;
mod filter;

pub(crate) use chain::{Pipeline, PipelineEvent};
pub use filter::{Filter, FilterFactory, PipelineTemplate};
