//! Trait definitions for the vendor library boundary
//!
//! These traits abstract over NVML so the monitor can be driven by a mock
//! in tests while using the real library in production.

use std::path::Path;

use crate::domain::{
    DecoderUtilization, EncoderUtilization, FanSpeed, Temperature, TemperatureSensor, Utilization,
};
use crate::error::NvmlError;

/// Opens a vendor library from a filesystem path
pub trait LibraryLoader {
    /// The library session type produced by this loader
    type Library: VendorLibrary;

    /// Dynamically load the library. The returned session is not yet
    /// initialized.
    fn load(&self, path: &Path) -> Result<Self::Library, NvmlError>;
}

/// A loaded vendor telemetry library
///
/// Each method maps to exactly one call into the vendor API. Implementations
/// must not cache or retry.
pub trait VendorLibrary: Send + Sync {
    /// Opaque per-device handle
    type Handle: Copy + Send + Sync;

    /// Initialize the driver session
    fn init(&mut self) -> Result<(), NvmlError>;

    /// Shut down the driver session
    fn shutdown(&mut self) -> Result<(), NvmlError>;

    /// Number of devices the driver reports
    fn device_count(&self) -> Result<u32, NvmlError>;

    /// Fetch the handle for the device at `index`
    fn device_handle_by_index(&self, index: u32) -> Result<Self::Handle, NvmlError>;

    /// GPU and memory utilization
    fn utilization(&self, device: Self::Handle) -> Result<Utilization, NvmlError>;

    /// Encoder utilization and its sampling period
    fn encoder_utilization(&self, device: Self::Handle) -> Result<EncoderUtilization, NvmlError>;

    /// Decoder utilization and its sampling period
    fn decoder_utilization(&self, device: Self::Handle) -> Result<DecoderUtilization, NvmlError>;

    /// Temperature reported by `sensor`
    fn temperature(
        &self,
        device: Self::Handle,
        sensor: TemperatureSensor,
    ) -> Result<Temperature, NvmlError>;

    /// Fan speed as a percentage of maximum
    fn fan_speed(&self, device: Self::Handle) -> Result<FanSpeed, NvmlError>;
}
