//! NVML abstraction layer
//!
//! Provides trait-based abstractions over NVML for testability.

pub mod device;
pub mod traits;
pub mod wrapper;

pub use device::DeviceHandle;
pub use traits::{LibraryLoader, VendorLibrary};
pub use wrapper::{NvmlLibrary, NvmlLoader, DEFAULT_LIBRARY};
