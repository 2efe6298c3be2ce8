//! Identifiers for the entities an event can concern.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an arrival source, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u32);

/// Identifier of a service device, unique across both pools, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

/// Identifier of a request, unique for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Run-wide request id sequence shared by every source.
///
/// Owned by the simulation and lent to sources, so ids stay monotone and
/// collision-free without global state.
#[derive(Debug, Clone)]
pub struct RequestIdAllocator {
    next: u64,
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdAllocator {
    /// Creates a sequence starting at `R1`.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Hands out the next id.
    pub fn allocate(&mut self) -> RequestId {
        let id = RequestId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotone() {
        let mut ids = RequestIdAllocator::new();
        let first = ids.allocate();
        let second = ids.allocate();

        assert_eq!(first, RequestId(1));
        assert!(second > first);
        assert_eq!(ids.allocated(), 2);
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(SourceId(2).to_string(), "S2");
        assert_eq!(DeviceId(3).to_string(), "D3");
        assert_eq!(RequestId(14).to_string(), "R14");
    }
}
