//! gpumon - NVML-based GPU telemetry library
//!
//! Reads per-device utilization, encoder/decoder load, temperature and fan
//! speed through NVIDIA's management library.
//!
//! ```no_run
//! use gpumon::GpuMonitor;
//!
//! let mut monitor = GpuMonitor::open_default()?;
//! for index in 0..monitor.device_count() {
//!     let util = monitor.gpu_utilization(index)?;
//!     println!("GPU {}: {}", index, util);
//! }
//! monitor.close()?;
//! # Ok::<(), gpumon::MonitorError>(())
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration system
//! - [`domain`]: Telemetry reading types
//! - [`error`]: Error types
//! - [`monitor`]: The monitor lifecycle and accessors
//! - [`nvml`]: NVML abstraction layer

pub mod config;
pub mod domain;
pub mod error;
pub mod monitor;
pub mod nvml;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{Accessor, MonitorError, NvmlError, Result};
pub use monitor::GpuMonitor;
