//! NVML library implementation
//!
//! Loads the NVIDIA management library from an explicit path and serves
//! device queries through nvml-wrapper.

use std::os::raw::c_uint;
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use nvml_wrapper::Nvml;

use crate::domain::{
    DecoderUtilization, EncoderUtilization, FanSpeed, Temperature, TemperatureSensor, Utilization,
};
use crate::error::NvmlError;
use crate::nvml::device::DeviceHandle;
use crate::nvml::traits::{LibraryLoader, VendorLibrary};

/// Platform default NVML library name
#[cfg(windows)]
pub const DEFAULT_LIBRARY: &str = "nvml.dll";

/// Platform default NVML library name
#[cfg(not(windows))]
pub const DEFAULT_LIBRARY: &str = "libnvidia-ml.so.1";

/// Entry point probed at load time to reject libraries that are not NVML
const INIT_SYMBOL: &[u8] = b"nvmlInit_v2\0";

/// Fan queried by [`VendorLibrary::fan_speed`]
const DEFAULT_FAN: u32 = 0;

/// Loader for the real NVML shared library
#[derive(Debug, Default, Clone, Copy)]
pub struct NvmlLoader;

impl LibraryLoader for NvmlLoader {
    type Library = NvmlLibrary;

    fn load(&self, path: &Path) -> Result<NvmlLibrary, NvmlError> {
        // SAFETY: loading NVML runs no initialization routines beyond the
        // dynamic loader's own
        let library = unsafe { Library::new(path) }
            .map_err(|e| NvmlError::LibraryNotFound(e.to_string()))?;

        {
            type InitFn = unsafe extern "C" fn() -> c_uint;
            // SAFETY: symbol is only resolved, never called here
            let _init: Symbol<InitFn> = unsafe { library.get(INIT_SYMBOL) }
                .map_err(|e| NvmlError::SymbolNotFound(format!("nvmlInit_v2: {}", e)))?;
        }

        log::debug!("Loaded NVML from {}", path.display());

        Ok(NvmlLibrary {
            path: path.to_path_buf(),
            library: Some(library),
            nvml: None,
        })
    }
}

/// A loaded NVML library and its driver session
pub struct NvmlLibrary {
    path: PathBuf,
    library: Option<Library>,
    nvml: Option<Nvml>,
}

impl NvmlLibrary {
    /// Path the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a reference to the underlying NVML session, if initialized
    pub fn nvml(&self) -> Option<&Nvml> {
        self.nvml.as_ref()
    }

    fn session(&self) -> Result<&Nvml, NvmlError> {
        self.nvml.as_ref().ok_or(NvmlError::Uninitialized)
    }
}

impl VendorLibrary for NvmlLibrary {
    type Handle = DeviceHandle;

    fn init(&mut self) -> Result<(), NvmlError> {
        let nvml = Nvml::builder()
            .lib_path(self.path.as_os_str())
            .init()
            .map_err(NvmlError::from)?;
        self.nvml = Some(nvml);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), NvmlError> {
        let result = match self.nvml.take() {
            Some(nvml) => nvml.shutdown().map_err(NvmlError::from),
            None => Ok(()),
        };
        self.library = None;
        result
    }

    fn device_count(&self) -> Result<u32, NvmlError> {
        self.session()?.device_count().map_err(NvmlError::from)
    }

    fn device_handle_by_index(&self, index: u32) -> Result<DeviceHandle, NvmlError> {
        let device = self
            .session()?
            .device_by_index(index)
            .map_err(|e| match e {
                nvml_wrapper::error::NvmlError::NotFound => NvmlError::DeviceNotFound(index),
                other => NvmlError::from(other),
            })?;
        Ok(DeviceHandle::from_device(&device))
    }

    fn utilization(&self, device: DeviceHandle) -> Result<Utilization, NvmlError> {
        // SAFETY: handles are only produced by this session
        let device = unsafe { device.bind(self.session()?) };
        let util = device.utilization_rates()?;
        Ok(Utilization::new(util.gpu, util.memory))
    }

    fn encoder_utilization(&self, device: DeviceHandle) -> Result<EncoderUtilization, NvmlError> {
        // SAFETY: handles are only produced by this session
        let device = unsafe { device.bind(self.session()?) };
        let info = device.encoder_utilization()?;
        Ok(EncoderUtilization::new(info.utilization, info.sampling_period))
    }

    fn decoder_utilization(&self, device: DeviceHandle) -> Result<DecoderUtilization, NvmlError> {
        // SAFETY: handles are only produced by this session
        let device = unsafe { device.bind(self.session()?) };
        let info = device.decoder_utilization()?;
        Ok(DecoderUtilization::new(info.utilization, info.sampling_period))
    }

    fn temperature(
        &self,
        device: DeviceHandle,
        sensor: TemperatureSensor,
    ) -> Result<Temperature, NvmlError> {
        // SAFETY: handles are only produced by this session
        let device = unsafe { device.bind(self.session()?) };
        let temp = device.temperature(sensor.to_nvml())?;
        Ok(Temperature::new(temp))
    }

    fn fan_speed(&self, device: DeviceHandle) -> Result<FanSpeed, NvmlError> {
        // SAFETY: handles are only produced by this session
        let device = unsafe { device.bind(self.session()?) };
        let speed = device.fan_speed(DEFAULT_FAN)?;
        Ok(FanSpeed::new(speed))
    }
}
