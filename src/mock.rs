//! Mock implementations for testing
//!
//! Provides a scriptable vendor library for exercising the monitor without
//! real hardware. Every call is recorded so tests can assert on exactly what
//! reached the vendor boundary.

use crate::domain::{
    DecoderUtilization, EncoderUtilization, FanSpeed, Temperature, TemperatureSensor, Utilization,
};
use crate::error::{Accessor, NvmlError};
use crate::nvml::{LibraryLoader, VendorLibrary};

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A call that reached the mock vendor library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Init,
    Shutdown,
    DeviceCount,
    DeviceHandle(u32),
    Utilization(u32),
    EncoderUtilization(u32),
    DecoderUtilization(u32),
    Temperature(u32, TemperatureSensor),
    FanSpeed(u32),
}

/// Shared record of calls, readable after the library has been consumed
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn record(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    /// All calls in order
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// Number of calls matching `pred`
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Indices passed to `device_handle_by_index`, in call order
    pub fn fetched_indices(&self) -> Vec<u32> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::DeviceHandle(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Mock GPU readings
#[derive(Debug, Clone)]
pub struct MockDevice {
    utilization: Utilization,
    encoder: EncoderUtilization,
    decoder: DecoderUtilization,
    temperature: Temperature,
    fan_speed: FanSpeed,
    failures: HashMap<Accessor, NvmlError>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self {
            utilization: Utilization::new(10, 5),
            encoder: EncoderUtilization::new(0, 167_000),
            decoder: DecoderUtilization::new(0, 167_000),
            temperature: Temperature::new(45),
            fan_speed: FanSpeed::new(30),
            failures: HashMap::new(),
        }
    }
}

impl MockDevice {
    /// Create a new mock device with default readings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set GPU/memory utilization
    pub fn with_utilization(mut self, gpu: u32, memory: u32) -> Self {
        self.utilization = Utilization::new(gpu, memory);
        self
    }

    /// Builder: set encoder utilization
    pub fn with_encoder(mut self, utilization: u32, sampling_period_us: u32) -> Self {
        self.encoder = EncoderUtilization::new(utilization, sampling_period_us);
        self
    }

    /// Builder: set decoder utilization
    pub fn with_decoder(mut self, utilization: u32, sampling_period_us: u32) -> Self {
        self.decoder = DecoderUtilization::new(utilization, sampling_period_us);
        self
    }

    /// Builder: set temperature
    pub fn with_temperature(mut self, celsius: u32) -> Self {
        self.temperature = Temperature::new(celsius);
        self
    }

    /// Builder: set fan speed
    pub fn with_fan_speed(mut self, percent: u32) -> Self {
        self.fan_speed = FanSpeed::new(percent);
        self
    }

    /// Builder: make one accessor's query fail
    pub fn failing(mut self, accessor: Accessor, err: NvmlError) -> Self {
        self.failures.insert(accessor, err);
        self
    }

    fn check(&self, accessor: Accessor) -> Result<(), NvmlError> {
        match self.failures.get(&accessor) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Handle into a [`MockLibrary`] device list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockHandle(u32);

/// Mock vendor library
#[derive(Debug, Clone, Default)]
pub struct MockLibrary {
    devices: Vec<MockDevice>,
    reported_count: Option<u32>,
    init_error: Option<NvmlError>,
    shutdown_error: Option<NvmlError>,
    count_error: Option<NvmlError>,
    handle_errors: HashMap<u32, NvmlError>,
    initialized: bool,
    log: CallLog,
}

impl MockLibrary {
    /// Create a library with `count` default devices
    pub fn new(count: u32) -> Self {
        Self::with_devices((0..count).map(|_| MockDevice::new()).collect())
    }

    /// Create a library with custom devices
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }

    /// Builder: report a device count different from the device list
    pub fn reporting_count(mut self, count: u32) -> Self {
        self.reported_count = Some(count);
        self
    }

    /// Builder: fail `init`
    pub fn failing_init(mut self, err: NvmlError) -> Self {
        self.init_error = Some(err);
        self
    }

    /// Builder: fail `shutdown`
    pub fn failing_shutdown(mut self, err: NvmlError) -> Self {
        self.shutdown_error = Some(err);
        self
    }

    /// Builder: fail `device_count`
    pub fn failing_count(mut self, err: NvmlError) -> Self {
        self.count_error = Some(err);
        self
    }

    /// Builder: fail `device_handle_by_index` for one index
    pub fn failing_handle(mut self, index: u32, err: NvmlError) -> Self {
        self.handle_errors.insert(index, err);
        self
    }

    /// The call log shared by every clone of this library
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn device(&self, handle: MockHandle) -> Result<&MockDevice, NvmlError> {
        if !self.initialized {
            return Err(NvmlError::Uninitialized);
        }
        self.devices
            .get(handle.0 as usize)
            .ok_or_else(|| {
                NvmlError::InvalidArgument(format!("invalid device handle {}", handle.0))
            })
    }
}

impl VendorLibrary for MockLibrary {
    type Handle = MockHandle;

    fn init(&mut self) -> Result<(), NvmlError> {
        self.log.record(Call::Init);
        if let Some(err) = &self.init_error {
            return Err(err.clone());
        }
        self.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), NvmlError> {
        self.log.record(Call::Shutdown);
        self.initialized = false;
        match &self.shutdown_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn device_count(&self) -> Result<u32, NvmlError> {
        self.log.record(Call::DeviceCount);
        if let Some(err) = &self.count_error {
            return Err(err.clone());
        }
        Ok(self.reported_count.unwrap_or(self.devices.len() as u32))
    }

    fn device_handle_by_index(&self, index: u32) -> Result<MockHandle, NvmlError> {
        self.log.record(Call::DeviceHandle(index));
        if let Some(err) = self.handle_errors.get(&index) {
            return Err(err.clone());
        }
        if index as usize >= self.devices.len() {
            return Err(NvmlError::DeviceNotFound(index));
        }
        Ok(MockHandle(index))
    }

    fn utilization(&self, device: MockHandle) -> Result<Utilization, NvmlError> {
        self.log.record(Call::Utilization(device.0));
        let d = self.device(device)?;
        d.check(Accessor::GpuUtilization)?;
        Ok(d.utilization)
    }

    fn encoder_utilization(&self, device: MockHandle) -> Result<EncoderUtilization, NvmlError> {
        self.log.record(Call::EncoderUtilization(device.0));
        let d = self.device(device)?;
        d.check(Accessor::EncoderUtilization)?;
        Ok(d.encoder)
    }

    fn decoder_utilization(&self, device: MockHandle) -> Result<DecoderUtilization, NvmlError> {
        self.log.record(Call::DecoderUtilization(device.0));
        let d = self.device(device)?;
        d.check(Accessor::DecoderUtilization)?;
        Ok(d.decoder)
    }

    fn temperature(
        &self,
        device: MockHandle,
        sensor: TemperatureSensor,
    ) -> Result<Temperature, NvmlError> {
        self.log.record(Call::Temperature(device.0, sensor));
        let d = self.device(device)?;
        d.check(Accessor::Temperature)?;
        Ok(d.temperature)
    }

    fn fan_speed(&self, device: MockHandle) -> Result<FanSpeed, NvmlError> {
        self.log.record(Call::FanSpeed(device.0));
        let d = self.device(device)?;
        d.check(Accessor::FanSpeed)?;
        Ok(d.fan_speed)
    }
}

/// Mock loader handing out clones of a prepared [`MockLibrary`]
#[derive(Debug, Clone)]
pub struct MockLoader {
    library: MockLibrary,
    load_error: Option<NvmlError>,
}

impl MockLoader {
    /// Create a loader that succeeds with `library`
    pub fn new(library: MockLibrary) -> Self {
        Self {
            library,
            load_error: None,
        }
    }

    /// Create a loader whose `load` always fails
    pub fn failing(err: NvmlError) -> Self {
        Self {
            library: MockLibrary::default(),
            load_error: Some(err),
        }
    }

    /// The call log of the library this loader hands out
    pub fn log(&self) -> CallLog {
        self.library.log()
    }
}

impl LibraryLoader for MockLoader {
    type Library = MockLibrary;

    fn load(&self, _path: &Path) -> Result<MockLibrary, NvmlError> {
        match &self.load_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.library.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_library_device_count() {
        let library = MockLibrary::new(2);
        assert_eq!(library.device_count().unwrap(), 2);

        let library = MockLibrary::new(2).reporting_count(3);
        assert_eq!(library.device_count().unwrap(), 3);
    }

    #[test]
    fn test_mock_library_handle_past_end() {
        let library = MockLibrary::new(2);
        assert!(library.device_handle_by_index(1).is_ok());
        assert_eq!(
            library.device_handle_by_index(2),
            Err(NvmlError::DeviceNotFound(2))
        );
    }

    #[test]
    fn test_mock_library_requires_init() {
        let mut library = MockLibrary::new(1);
        let handle = library.device_handle_by_index(0).unwrap();
        assert_eq!(library.fan_speed(handle), Err(NvmlError::Uninitialized));

        library.init().unwrap();
        assert_eq!(library.fan_speed(handle).unwrap().as_percentage(), 30);
    }

    #[test]
    fn test_mock_log_shared_between_clones() {
        let library = MockLibrary::new(1);
        let log = library.log();
        let mut clone = library.clone();
        clone.init().unwrap();
        assert_eq!(log.calls(), vec![Call::Init]);
    }

    #[test]
    fn test_mock_loader_failure() {
        let loader = MockLoader::failing(NvmlError::LibraryNotFound("nope".to_string()));
        assert!(loader.load(Path::new("nvml.dll")).is_err());
    }
}
