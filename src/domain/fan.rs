//! Fan-related domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fan speed as a percentage of the fan's maximum
///
/// Not range-checked: some boards report values above 100 and those are
/// passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FanSpeed(u32);

impl FanSpeed {
    /// Create a new FanSpeed
    pub const fn new(percent: u32) -> Self {
        Self(percent)
    }

    /// Get the speed as a percentage value
    #[inline]
    pub const fn as_percentage(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl From<u32> for FanSpeed {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<FanSpeed> for u32 {
    fn from(speed: FanSpeed) -> Self {
        speed.0
    }
}
