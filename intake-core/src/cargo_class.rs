//! Cargo classes handled by the intake hub.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Class of cargo carried by a request.
///
/// The class picks the buffer, the device pool, and the deadline offset a
/// request is subject to. Perishable cargo is served by the priority-1 pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CargoClass {
    Perishable,
    Regular,
}

impl CargoClass {
    /// Every class, in priority order.
    pub const ALL: [CargoClass; 2] = [CargoClass::Perishable, CargoClass::Regular];

    /// Priority of the device pool that serves this class (1 is highest).
    pub fn priority(self) -> u8 {
        match self {
            CargoClass::Perishable => 1,
            CargoClass::Regular => 2,
        }
    }

    /// Returns string representation for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            CargoClass::Perishable => "perishable",
            CargoClass::Regular => "regular",
        }
    }
}

impl fmt::Display for CargoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perishable_has_higher_priority() {
        assert!(CargoClass::Perishable.priority() < CargoClass::Regular.priority());
        assert_eq!(CargoClass::ALL[0], CargoClass::Perishable);
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(CargoClass::Regular.to_string(), "regular");
    }
}
