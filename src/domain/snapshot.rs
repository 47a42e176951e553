//! One-shot view of every reading for a single device

use serde::{Deserialize, Serialize};

use super::{DecoderUtilization, EncoderUtilization, FanSpeed, Temperature, Utilization};

/// All telemetry for one GPU, read back to back
///
/// A field is `None` when that particular query failed; the rest of the
/// snapshot is still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub index: u32,
    pub utilization: Option<Utilization>,
    pub encoder: Option<EncoderUtilization>,
    pub decoder: Option<DecoderUtilization>,
    pub temperature: Option<Temperature>,
    pub fan_speed: Option<FanSpeed>,
}

impl DeviceSnapshot {
    /// Create an empty snapshot for a device
    pub const fn empty(index: u32) -> Self {
        Self {
            index,
            utilization: None,
            encoder: None,
            decoder: None,
            temperature: None,
            fan_speed: None,
        }
    }

    /// True when every query in the snapshot succeeded
    pub fn is_complete(&self) -> bool {
        self.utilization.is_some()
            && self.encoder.is_some()
            && self.decoder.is_some()
            && self.temperature.is_some()
            && self.fan_speed.is_some()
    }
}
