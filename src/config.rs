//! Hub-wide and per-service configuration.
//!
//! Both structs follow the same pattern: sensible `Default`s, fluent setters,
//! and `from_json` for loading from a JSON document where every field is
//! optional.
//!
//! ```
//! use vpipe::config::{PipeConfig, SessionConfig};
//!
//! let hub = PipeConfig::from_json(r#"{ "allocator_capacity": 16 }"#).unwrap();
//! assert_eq!(hub.allocator_capacity, 16);
//!
//! let session = SessionConfig::default().both_idle(std::time::Duration::from_secs(30));
//! assert!(session.idle_time(vpipe::IdleStatus::BothIdle).is_some());
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VpipeError};
use crate::session::IdleStatus;

/// Number of addresses in the full negative `i32` range.
pub const FULL_ALLOCATOR_CAPACITY: u32 = 1 << 31;

/// Default idle checker period.
pub const DEFAULT_IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration shared by every service attached to one hub.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipeConfig {
    /// Number of local addresses the allocator may hand out (`1..=2^31`).
    pub allocator_capacity: u32,
    /// How often the idle checker task scans sessions, in milliseconds.
    pub idle_check_interval_ms: u64,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            allocator_capacity: FULL_ALLOCATOR_CAPACITY,
            idle_check_interval_ms: DEFAULT_IDLE_CHECK_INTERVAL.as_millis() as u64,
        }
    }
}

impl PipeConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| VpipeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the allocator pool size.
    pub fn allocator_capacity(mut self, capacity: u32) -> Self {
        self.allocator_capacity = capacity;
        self
    }

    /// Set the idle checker period.
    pub fn idle_check_interval(mut self, interval: Duration) -> Self {
        self.idle_check_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Idle checker period as a `Duration`.
    pub fn idle_check_period(&self) -> Duration {
        Duration::from_millis(self.idle_check_interval_ms)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.allocator_capacity == 0 || self.allocator_capacity > FULL_ALLOCATOR_CAPACITY {
            return Err(VpipeError::Config(format!(
                "allocator_capacity must be within 1..={}, got {}",
                FULL_ALLOCATOR_CAPACITY, self.allocator_capacity
            )));
        }
        if self.idle_check_interval_ms == 0 {
            return Err(VpipeError::Config(
                "idle_check_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-service session settings.
///
/// An idle time of zero disables that kind of idle notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Fire `ReaderIdle` after this many milliseconds without a received message.
    pub reader_idle_ms: u64,
    /// Fire `WriterIdle` after this many milliseconds without a written message.
    pub writer_idle_ms: u64,
    /// Fire `BothIdle` after this many milliseconds without any traffic.
    pub both_idle_ms: u64,
}

impl SessionConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| VpipeError::Config(e.to_string()))
    }

    /// Set the reader idle time.
    pub fn reader_idle(mut self, idle: Duration) -> Self {
        self.reader_idle_ms = idle.as_millis() as u64;
        self
    }

    /// Set the writer idle time.
    pub fn writer_idle(mut self, idle: Duration) -> Self {
        self.writer_idle_ms = idle.as_millis() as u64;
        self
    }

    /// Set the both-directions idle time.
    pub fn both_idle(mut self, idle: Duration) -> Self {
        self.both_idle_ms = idle.as_millis() as u64;
        self
    }

    /// Idle time for the given status, `None` when disabled.
    pub fn idle_time(&self, status: IdleStatus) -> Option<Duration> {
        let ms = match status {
            IdleStatus::ReaderIdle => self.reader_idle_ms,
            IdleStatus::WriterIdle => self.writer_idle_ms,
            IdleStatus::BothIdle => self.both_idle_ms,
        };
        (ms > 0).then(|| Duration::from_millis(ms))
    }
}
