//! Pipeline filters and the per-service pipeline template.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Result, VpipeError};
use crate::session::PipeSession;

/// A processing stage in a session pipeline.
///
/// Inbound messages pass through filters first-to-last before reaching the
/// handler; outbound writes pass last-to-first before reaching the peer.
/// Returning `Ok(None)` swallows the message. Returning `Err` stops the
/// message and reports the error to the handler's `exception_caught`
/// (inbound) or to the writer (outbound).
pub trait Filter: Send + Sync + 'static {
    /// Called once when the session's pipeline starts, before the handler's
    /// `session_opened`.
    fn session_opened(&self, _session: &PipeSession) {}

    /// Process an inbound message.
    fn message_received(&self, _session: &PipeSession, message: Bytes) -> Result<Option<Bytes>> {
        Ok(Some(message))
    }

    /// Process an outbound message.
    fn filter_write(&self, _session: &PipeSession, message: Bytes) -> Result<Option<Bytes>> {
        Ok(Some(message))
    }

    /// Called once when the session closes, before the handler's `session_closed`.
    fn session_closed(&self, _session: &PipeSession) {}
}

/// Produces one filter instance per session.
pub type FilterFactory = Arc<dyn Fn() -> Result<Arc<dyn Filter>> + Send + Sync>;

/// A filter instance installed in a session pipeline.
#[derive(Clone)]
pub(crate) struct NamedFilter {
    pub(crate) name: String,
    pub(crate) filter: Arc<dyn Filter>,
}

/// Ordered list of filter factories a service applies to each new session.
#[derive(Clone, Default)]
pub struct PipelineTemplate {
    entries: Vec<(String, FilterFactory)>,
}

impl PipelineTemplate {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter shared by every session built from this template.
    pub fn add_last<F: Filter>(&mut self, name: &str, filter: F) -> &mut Self {
        let shared: Arc<dyn Filter> = Arc::new(filter);
        self.add_last_with(name, move || Ok(Arc::clone(&shared)))
    }

    /// Append a factory that builds a fresh filter for every session.
    ///
    /// A factory error fails the session's bootstrap.
    pub fn add_last_with<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn Filter>> + Send + Sync + 'static,
    {
        self.entries.push((name.to_string(), Arc::new(factory)));
        self
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the template has no filters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filter names in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Whether a filter with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Build the filter instances for one session.
    pub(crate) fn instantiate(&self) -> Result<Vec<NamedFilter>> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut filters = Vec::with_capacity(self.entries.len());

        for (name, factory) in &self.entries {
            if !seen.insert(name.as_str()) {
                return Err(VpipeError::DuplicateFilter(name.clone()));
            }
            filters.push(NamedFilter {
                name: name.clone(),
                filter: factory()?,
            });
        }

        Ok(filters)
    }
}

impl fmt::Debug for PipelineTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
