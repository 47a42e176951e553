//! Domain models for gpumon
//!
//! Typed telemetry readings. Values are raw vendor readings; no type here
//! validates or clamps what NVML returns.

pub mod fan;
pub mod performance;
pub mod snapshot;
pub mod thermal;

pub use fan::FanSpeed;
pub use performance::{DecoderUtilization, EncoderUtilization, Utilization};
pub use snapshot::DeviceSnapshot;
pub use thermal::{Temperature, TemperatureSensor};
