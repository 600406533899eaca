//! Endpoint addresses for virtual pipes.
//!
//! Acceptors bind to caller-chosen non-negative addresses. Connector-side
//! addresses are handed out by the
//! [`LocalAddressAllocator`](crate::transport::LocalAddressAllocator) from the
//! negative range, so the two never collide.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VpipeError;

/// Display prefix for pipe addresses.
const SCHEME: &str = "pipe:";

/// Address of one end of a virtual pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipeAddress(i32);

impl PipeAddress {
    /// Create an address from its port number.
    #[inline]
    pub const fn new(port: i32) -> Self {
        Self(port)
    }

    /// The port number.
    #[inline]
    pub const fn port(self) -> i32 {
        self.0
    }

    /// Whether this address lies in the range reserved for connector sides.
    #[inline]
    pub const fn is_ephemeral(self) -> bool {
        self.0 < 0
    }
}

impl From<i32> for PipeAddress {
    fn from(port: i32) -> Self {
        Self(port)
    }
}

impl fmt::Display for PipeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SCHEME, self.0)
    }
}

impl FromStr for PipeAddress {
    type Err = VpipeError;

    /// Parses `pipe:<n>` or a bare integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix(SCHEME).unwrap_or(s.trim());
        digits
            .parse::<i32>()
            .map(Self)
            .map_err(|e| VpipeError::Config(format!("invalid pipe address {:?}: {}", s, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PipeAddress::new(8080).to_string(), "pipe:8080");
        assert_eq!(PipeAddress::new(-3).to_string(), "pipe:-3");
    }

    #[test]
    fn test_parse_with_and_without_scheme() {
        assert_eq!("pipe:42".parse::<PipeAddress>().unwrap(), PipeAddress::new(42));
        assert_eq!("  7 ".parse::<PipeAddress>().unwrap(), PipeAddress::new(7));
        assert_eq!("pipe:-1".parse::<PipeAddress>().unwrap(), PipeAddress::new(-1));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = "tcp:80".parse::<PipeAddress>();
        assert!(matches!(result, Err(VpipeError::Config(_))));
    }

    #[test]
    fn test_ephemeral_range() {
        assert!(PipeAddress::new(-1).is_ephemeral());
        assert!(!PipeAddress::new(0).is_ephemeral());
        assert!(!PipeAddress::new(1).is_ephemeral());
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&PipeAddress::new(12)).unwrap();
        assert_eq!(json, "12");
        let back: PipeAddress = serde_json::from_str("12").unwrap();
        assert_eq!(back, PipeAddress::new(12));
    }
}
