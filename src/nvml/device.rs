//! NVML device handle

use nvml_wrapper::{Device, Nvml};
use nvml_wrapper_sys::bindings::nvmlDevice_t;

/// Raw NVML device handle captured at enumeration time
///
/// The handle stays valid for as long as the NVML session that produced it.
/// It is rehydrated into an nvml-wrapper [`Device`] for each query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHandle(nvmlDevice_t);

// SAFETY: NVML device handles are opaque identifiers and NVML is documented
// as thread-safe. Reads through the same handle from several threads are
// synchronized inside the driver, not here.
unsafe impl Send for DeviceHandle {}
unsafe impl Sync for DeviceHandle {}

impl DeviceHandle {
    /// Capture the raw handle of an enumerated device
    pub(crate) fn from_device(device: &Device<'_>) -> Self {
        // SAFETY: handle() only copies the pointer out of the wrapper
        Self(unsafe { device.handle() })
    }

    /// Rebuild a borrowing [`Device`] against the session that produced it
    ///
    /// # Safety
    /// `nvml` must be the initialized session this handle was enumerated from.
    pub(crate) unsafe fn bind<'nvml>(&self, nvml: &'nvml Nvml) -> Device<'nvml> {
        Device::new(self.0, nvml)
    }
}
