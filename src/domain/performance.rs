//! Utilization domain types
//!
//! Readings are raw passthroughs of what NVML reports. Nothing here clamps
//! or rescales a value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// GPU and memory utilization rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Utilization {
    /// GPU compute utilization (percent)
    pub gpu: u32,
    /// Memory bandwidth utilization (percent)
    pub memory: u32,
}

impl Utilization {
    /// Create a new utilization value
    pub const fn new(gpu: u32, memory: u32) -> Self {
        Self { gpu, memory }
    }

    /// Get GPU utilization as percentage
    pub const fn gpu_percent(&self) -> u32 {
        self.gpu
    }

    /// Get memory bandwidth utilization as percentage
    pub const fn memory_percent(&self) -> u32 {
        self.memory
    }
}

impl From<Utilization> for (u32, u32) {
    fn from(util: Utilization) -> Self {
        (util.gpu, util.memory)
    }
}

impl fmt::Display for Utilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpu {}%, memory {}%", self.gpu, self.memory)
    }
}

/// Video encoder utilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncoderUtilization {
    /// Encoder utilization (percent)
    pub utilization: u32,
    /// Sampling period in microseconds
    pub sampling_period_us: u32,
}

impl EncoderUtilization {
    /// Create new encoder utilization
    pub const fn new(utilization: u32, sampling_period_us: u32) -> Self {
        Self {
            utilization,
            sampling_period_us,
        }
    }

    /// Get utilization as percentage
    pub const fn percent(&self) -> u32 {
        self.utilization
    }
}

impl From<EncoderUtilization> for (u32, u32) {
    fn from(util: EncoderUtilization) -> Self {
        (util.utilization, util.sampling_period_us)
    }
}

/// Video decoder utilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecoderUtilization {
    /// Decoder utilization (percent)
    pub utilization: u32,
    /// Sampling period in microseconds
    pub sampling_period_us: u32,
}

impl DecoderUtilization {
    /// Create new decoder utilization
    pub const fn new(utilization: u32, sampling_period_us: u32) -> Self {
        Self {
            utilization,
            sampling_period_us,
        }
    }

    /// Get utilization as percentage
    pub const fn percent(&self) -> u32 {
        self.utilization
    }
}

impl From<DecoderUtilization> for (u32, u32) {
    fn from(util: DecoderUtilization) -> Self {
        (util.utilization, util.sampling_period_us)
    }
}
