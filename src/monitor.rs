//! GPU telemetry monitor
//!
//! [`GpuMonitor`] owns one vendor library session and the device handles
//! enumerated from it. Every accessor issues exactly one blocking query.
//!
//! No locking is done here. Concurrent reads through a shared monitor are only
//! as safe as the vendor library's own read queries; NVML documents those as
//! thread-safe.

use std::path::Path;

use crate::config::MonitorConfig;
use crate::domain::{
    DecoderUtilization, DeviceSnapshot, EncoderUtilization, FanSpeed, Temperature,
    TemperatureSensor, Utilization,
};
use crate::error::{Accessor, MonitorError, NvmlError, Result};
use crate::nvml::{LibraryLoader, NvmlLibrary, NvmlLoader, VendorLibrary, DEFAULT_LIBRARY};

/// Per-device telemetry over a vendor library session
///
/// Created fully enumerated or not at all. Call [`GpuMonitor::close`] to
/// release the session; a monitor dropped while still attached shuts the
/// session down on a best-effort basis.
pub struct GpuMonitor<L: VendorLibrary = NvmlLibrary> {
    library: Option<L>,
    devices: Vec<L::Handle>,
}

impl GpuMonitor<NvmlLibrary> {
    /// Load NVML from `path`, initialize it and enumerate all GPUs
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::create(&NvmlLoader, path.as_ref())
    }

    /// Same as [`GpuMonitor::open`] with the platform's default library name
    pub fn open_default() -> Result<Self> {
        Self::open(DEFAULT_LIBRARY)
    }

    /// Open the library named by `config`, falling back to the platform default
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Self::open(config.resolved_library_path())
    }
}

impl<L: VendorLibrary> GpuMonitor<L> {
    /// Load a library through `loader`, initialize it and enumerate devices
    ///
    /// # Errors
    /// - [`MonitorError::Load`] if the library cannot be loaded
    /// - [`MonitorError::Init`] if the driver rejects initialization; the
    ///   session is shut down before returning
    /// - [`MonitorError::Enumeration`] if the device count or any handle
    ///   cannot be fetched; the session is shut down before returning
    pub fn create<Ld>(loader: &Ld, path: &Path) -> Result<Self>
    where
        Ld: LibraryLoader<Library = L>,
    {
        let mut library = loader.load(path).map_err(|source| MonitorError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        if let Err(source) = library.init() {
            let cleanup = library.shutdown().err();
            if let Some(e) = &cleanup {
                log::warn!("NVML cleanup after failed init also failed: {}", e);
            }
            return Err(MonitorError::Init { source, cleanup });
        }

        let mut monitor = Self {
            library: Some(library),
            devices: Vec::new(),
        };
        if let Err(mut err) = monitor.enumerate() {
            if let MonitorError::Enumeration { cleanup, .. } = &mut err {
                *cleanup = monitor.release();
            }
            return Err(err);
        }

        log::info!(
            "NVML initialized from {} with {} GPU(s)",
            path.display(),
            monitor.device_count()
        );
        Ok(monitor)
    }

    fn enumerate(&mut self) -> Result<()> {
        let library = self.library.as_ref().ok_or(MonitorError::Closed)?;

        let count = library
            .device_count()
            .map_err(|source| MonitorError::Enumeration {
                index: None,
                source,
                cleanup: None,
            })?;
        log::debug!("NVML reports {} device(s)", count);

        let mut devices = Vec::with_capacity(count as usize);
        for index in 0..count {
            let handle = library.device_handle_by_index(index).map_err(|source| {
                MonitorError::Enumeration {
                    index: Some(index),
                    source,
                    cleanup: None,
                }
            })?;
            devices.push(handle);
        }

        self.devices = devices;
        Ok(())
    }

    /// Number of enumerated devices
    pub fn device_count(&self) -> u32 {
        self.devices.len() as u32
    }

    /// Whether the session has been released
    pub fn is_closed(&self) -> bool {
        self.library.is_none()
    }

    /// The underlying library session, if still attached
    pub fn library(&self) -> Option<&L> {
        self.library.as_ref()
    }

    fn resolve(&self, index: u32) -> Result<(&L, L::Handle)> {
        let library = self.library.as_ref().ok_or(MonitorError::Closed)?;
        let handle = self.devices.get(index as usize).copied().ok_or_else(|| {
            MonitorError::IndexOutOfRange {
                index,
                count: self.device_count(),
            }
        })?;
        Ok((library, handle))
    }

    fn query<T>(
        &self,
        index: u32,
        accessor: Accessor,
        f: impl FnOnce(&L, L::Handle) -> std::result::Result<T, NvmlError>,
    ) -> Result<T> {
        let (library, handle) = self.resolve(index)?;
        f(library, handle).map_err(|source| MonitorError::Query {
            index,
            accessor,
            source,
        })
    }

    /// GPU and memory utilization of the device at `index`
    pub fn gpu_utilization(&self, index: u32) -> Result<Utilization> {
        self.query(index, Accessor::GpuUtilization, |lib, dev| {
            lib.utilization(dev)
        })
    }

    /// Encoder utilization and sampling period of the device at `index`
    pub fn encoder_utilization(&self, index: u32) -> Result<EncoderUtilization> {
        self.query(index, Accessor::EncoderUtilization, |lib, dev| {
            lib.encoder_utilization(dev)
        })
    }

    /// Decoder utilization and sampling period of the device at `index`
    pub fn decoder_utilization(&self, index: u32) -> Result<DecoderUtilization> {
        self.query(index, Accessor::DecoderUtilization, |lib, dev| {
            lib.decoder_utilization(dev)
        })
    }

    /// GPU sensor temperature of the device at `index`
    pub fn temperature(&self, index: u32) -> Result<Temperature> {
        self.query(index, Accessor::Temperature, |lib, dev| {
            lib.temperature(dev, TemperatureSensor::Gpu)
        })
    }

    /// Fan speed of the device at `index`
    pub fn fan_speed(&self, index: u32) -> Result<FanSpeed> {
        self.query(index, Accessor::FanSpeed, |lib, dev| lib.fan_speed(dev))
    }

    /// Read every accessor once for the device at `index`
    ///
    /// Range and session errors are returned; a failing individual query
    /// leaves its field empty.
    pub fn snapshot(&self, index: u32) -> Result<DeviceSnapshot> {
        self.resolve(index)?;

        let mut snapshot = DeviceSnapshot::empty(index);
        snapshot.utilization = reading(self.gpu_utilization(index));
        snapshot.encoder = reading(self.encoder_utilization(index));
        snapshot.decoder = reading(self.decoder_utilization(index));
        snapshot.temperature = reading(self.temperature(index));
        snapshot.fan_speed = reading(self.fan_speed(index));
        Ok(snapshot)
    }

    /// Shut down the vendor session
    ///
    /// A no-op if no session is attached. The session is released even when
    /// shutdown reports an error, so a second call always succeeds.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut library) = self.library.take() else {
            return Ok(());
        };
        library
            .shutdown()
            .map_err(|source| MonitorError::Shutdown { source })?;
        log::debug!("NVML session shut down");
        Ok(())
    }
}

impl<L: VendorLibrary> GpuMonitor<L> {
    /// Best-effort shutdown of a still-attached session
    fn release(&mut self) -> Option<NvmlError> {
        let mut library = self.library.take()?;
        let err = library.shutdown().err();
        if let Some(e) = &err {
            log::warn!("Failed to shutdown NVML: {}", e);
        }
        err
    }
}

fn reading<T>(result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("{}", e);
            None
        }
    }
}

impl<L: VendorLibrary> Drop for GpuMonitor<L> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<L: VendorLibrary> std::fmt::Debug for GpuMonitor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuMonitor")
            .field("device_count", &self.device_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockDevice, MockLibrary, MockLoader};

    fn open(loader: &MockLoader) -> Result<GpuMonitor<MockLibrary>> {
        GpuMonitor::create(loader, Path::new(DEFAULT_LIBRARY))
    }

    fn shutdowns(loader: &MockLoader) -> usize {
        loader.log().count(|c| *c == Call::Shutdown)
    }

    #[test]
    fn test_enumerates_exactly_reported_count() {
        let loader = MockLoader::new(MockLibrary::new(3));
        let monitor = open(&loader).unwrap();

        assert_eq!(monitor.device_count(), 3);
        // index 3 is one past the end and must never be fetched
        assert_eq!(loader.log().fetched_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_devices() {
        let loader = MockLoader::new(MockLibrary::new(0));
        let monitor = open(&loader).unwrap();

        assert_eq!(monitor.device_count(), 0);
        assert!(loader.log().fetched_indices().is_empty());
        assert!(matches!(
            monitor.temperature(0),
            Err(MonitorError::IndexOutOfRange { index: 0, count: 0 })
        ));
    }

    #[test]
    fn test_lifecycle_call_order() {
        let loader = MockLoader::new(MockLibrary::new(1));
        let mut monitor = open(&loader).unwrap();
        monitor.close().unwrap();

        assert_eq!(
            loader.log().calls(),
            vec![
                Call::Init,
                Call::DeviceCount,
                Call::DeviceHandle(0),
                Call::Shutdown
            ]
        );
    }

    #[test]
    fn test_load_failure() {
        let loader = MockLoader::failing(NvmlError::LibraryNotFound("missing".to_string()));
        let err = open(&loader).unwrap_err();

        assert!(matches!(
            err,
            MonitorError::Load {
                source: NvmlError::LibraryNotFound(_),
                ..
            }
        ));
        assert!(err.to_string().contains(DEFAULT_LIBRARY));
    }

    #[test]
    fn test_init_failure_cleans_up() {
        let loader = MockLoader::new(MockLibrary::new(2).failing_init(NvmlError::DriverNotLoaded));
        let err = open(&loader).unwrap_err();

        assert!(matches!(
            err,
            MonitorError::Init {
                source: NvmlError::DriverNotLoaded,
                cleanup: None
            }
        ));
        assert_eq!(shutdowns(&loader), 1);
        assert_eq!(loader.log().count(|c| *c == Call::DeviceCount), 0);
    }

    #[test]
    fn test_init_failure_keeps_cause_when_cleanup_fails() {
        let library = MockLibrary::new(1)
            .failing_init(NvmlError::DriverNotLoaded)
            .failing_shutdown(NvmlError::Uninitialized);
        let loader = MockLoader::new(library);

        match open(&loader).unwrap_err() {
            MonitorError::Init { source, cleanup } => {
                assert_eq!(source, NvmlError::DriverNotLoaded);
                assert_eq!(cleanup, Some(NvmlError::Uninitialized));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_device_count_failure() {
        let library =
            MockLibrary::new(2).failing_count(NvmlError::Unknown("count failed".to_string()));
        let loader = MockLoader::new(library);
        let err = open(&loader).unwrap_err();

        assert!(matches!(err, MonitorError::Enumeration { index: None, .. }));
        assert_eq!(shutdowns(&loader), 1);
    }

    #[test]
    fn test_handle_failure_is_all_or_nothing() {
        let library = MockLibrary::new(4).failing_handle(2, NvmlError::GpuLost);
        let loader = MockLoader::new(library);
        let err = open(&loader).unwrap_err();

        assert!(matches!(
            err,
            MonitorError::Enumeration {
                index: Some(2),
                source: NvmlError::GpuLost,
                cleanup: None
            }
        ));
        assert_eq!(err.device_index(), Some(2));
        assert_eq!(loader.log().fetched_indices(), vec![0, 1, 2]);
        // the partially enumerated session is released, not leaked
        assert_eq!(shutdowns(&loader), 1);
    }

    #[test]
    fn test_count_past_device_list_fails_enumeration() {
        let loader = MockLoader::new(MockLibrary::new(2).reporting_count(3));
        let err = open(&loader).unwrap_err();

        assert!(matches!(
            err,
            MonitorError::Enumeration {
                index: Some(2),
                source: NvmlError::DeviceNotFound(2),
                ..
            }
        ));
    }

    #[test]
    fn test_enumeration_failure_keeps_rollback_error() {
        let library = MockLibrary::new(3)
            .failing_handle(1, NvmlError::GpuLost)
            .failing_shutdown(NvmlError::Unknown("stuck".to_string()));
        let loader = MockLoader::new(library);

        match open(&loader).unwrap_err() {
            MonitorError::Enumeration {
                index,
                source,
                cleanup,
            } => {
                assert_eq!(index, Some(1));
                assert_eq!(source, NvmlError::GpuLost);
                assert_eq!(cleanup, Some(NvmlError::Unknown("stuck".to_string())));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(shutdowns(&loader), 1);
    }

    #[test]
    fn test_from_config_loads_configured_path() {
        let config = MonitorConfig {
            library_path: Some("/nonexistent/x.so".into()),
        };

        match GpuMonitor::from_config(&config).unwrap_err() {
            MonitorError::Load { path, .. } => {
                assert_eq!(path, std::path::PathBuf::from("/nonexistent/x.so"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_gpu_utilization_passthrough() {
        let library = MockLibrary::with_devices(vec![MockDevice::new().with_utilization(42, 17)]);
        let loader = MockLoader::new(library);
        let monitor = open(&loader).unwrap();
        loader.log().clear();

        let util = monitor.gpu_utilization(0).unwrap();
        assert_eq!(<(u32, u32)>::from(util), (42, 17));
        assert_eq!(loader.log().calls(), vec![Call::Utilization(0)]);
    }

    #[test]
    fn test_encoder_utilization_passthrough() {
        let library = MockLibrary::with_devices(vec![
            MockDevice::new(),
            MockDevice::new().with_encoder(55, 1000),
        ]);
        let loader = MockLoader::new(library);
        let monitor = open(&loader).unwrap();
        loader.log().clear();

        let enc = monitor.encoder_utilization(1).unwrap();
        assert_eq!(<(u32, u32)>::from(enc), (55, 1000));
        assert_eq!(loader.log().calls(), vec![Call::EncoderUtilization(1)]);
    }

    #[test]
    fn test_decoder_utilization_passthrough() {
        let library = MockLibrary::with_devices(vec![MockDevice::new().with_decoder(33, 20_000)]);
        let loader = MockLoader::new(library);
        let monitor = open(&loader).unwrap();
        loader.log().clear();

        let dec = monitor.decoder_utilization(0).unwrap();
        assert_eq!(dec, DecoderUtilization::new(33, 20_000));
        assert_eq!(loader.log().calls(), vec![Call::DecoderUtilization(0)]);
    }

    #[test]
    fn test_temperature_uses_gpu_sensor() {
        let library = MockLibrary::with_devices(vec![MockDevice::new().with_temperature(71)]);
        let loader = MockLoader::new(library);
        let monitor = open(&loader).unwrap();
        loader.log().clear();

        assert_eq!(monitor.temperature(0).unwrap().as_celsius(), 71);
        assert_eq!(
            loader.log().calls(),
            vec![Call::Temperature(0, TemperatureSensor::Gpu)]
        );
    }

    #[test]
    fn test_fan_speed_not_clamped() {
        let library = MockLibrary::with_devices(vec![MockDevice::new().with_fan_speed(120)]);
        let loader = MockLoader::new(library);
        let monitor = open(&loader).unwrap();
        loader.log().clear();

        assert_eq!(monitor.fan_speed(0).unwrap().as_percentage(), 120);
        assert_eq!(loader.log().calls(), vec![Call::FanSpeed(0)]);
    }

    #[test]
    fn test_each_call_queries_again() {
        let loader = MockLoader::new(MockLibrary::new(1));
        let monitor = open(&loader).unwrap();
        loader.log().clear();

        monitor.temperature(0).unwrap();
        monitor.temperature(0).unwrap();
        assert_eq!(
            loader
                .log()
                .count(|c| matches!(c, Call::Temperature(0, _))),
            2
        );
    }

    #[test]
    fn test_index_out_of_range_is_typed_error() {
        let loader = MockLoader::new(MockLibrary::new(2));
        let monitor = open(&loader).unwrap();
        loader.log().clear();

        for result in [
            monitor.gpu_utilization(2).map(|_| ()),
            monitor.encoder_utilization(2).map(|_| ()),
            monitor.decoder_utilization(5).map(|_| ()),
            monitor.temperature(u32::MAX).map(|_| ()),
            monitor.fan_speed(2).map(|_| ()),
        ] {
            assert!(matches!(
                result,
                Err(MonitorError::IndexOutOfRange { count: 2, .. })
            ));
        }
        assert!(loader.log().calls().is_empty());
    }

    #[test]
    fn test_query_error_carries_index_and_accessor() {
        let library = MockLibrary::with_devices(vec![
            MockDevice::new(),
            MockDevice::new().failing(
                Accessor::DecoderUtilization,
                NvmlError::NotSupported("no NVDEC".to_string()),
            ),
        ]);
        let loader = MockLoader::new(library);
        let monitor = open(&loader).unwrap();

        let err = monitor.decoder_utilization(1).unwrap_err();
        assert_eq!(err.device_index(), Some(1));
        assert_eq!(err.accessor(), Some(Accessor::DecoderUtilization));
        let msg = err.to_string();
        assert!(msg.contains("decoder utilization"));
        assert!(msg.contains("gpu 1"));

        // other accessors on the same device are unaffected
        assert!(monitor.encoder_utilization(1).is_ok());
    }

    #[test]
    fn test_close_twice_is_noop() {
        let loader = MockLoader::new(MockLibrary::new(1));
        let mut monitor = open(&loader).unwrap();

        monitor.close().unwrap();
        monitor.close().unwrap();
        assert!(monitor.is_closed());
        assert_eq!(shutdowns(&loader), 1);
    }

    #[test]
    fn test_close_keeps_devices_but_rejects_queries() {
        let loader = MockLoader::new(MockLibrary::new(2));
        let mut monitor = open(&loader).unwrap();
        monitor.close().unwrap();

        assert_eq!(monitor.device_count(), 2);
        assert!(matches!(monitor.fan_speed(0), Err(MonitorError::Closed)));
    }

    #[test]
    fn test_close_surfaces_shutdown_error_once() {
        let library = MockLibrary::new(1).failing_shutdown(NvmlError::Unknown("busy".to_string()));
        let loader = MockLoader::new(library);
        let mut monitor = open(&loader).unwrap();

        assert!(matches!(
            monitor.close(),
            Err(MonitorError::Shutdown { .. })
        ));
        assert!(monitor.close().is_ok());
        assert_eq!(shutdowns(&loader), 1);
    }

    #[test]
    fn test_drop_without_close_releases_session() {
        let loader = MockLoader::new(MockLibrary::new(1));
        {
            let _monitor = open(&loader).unwrap();
        }
        assert_eq!(shutdowns(&loader), 1);
    }

    #[test]
    fn test_drop_after_close_does_not_shutdown_again() {
        let loader = MockLoader::new(MockLibrary::new(1));
        {
            let mut monitor = open(&loader).unwrap();
            monitor.close().unwrap();
        }
        assert_eq!(shutdowns(&loader), 1);
    }

    #[test]
    fn test_snapshot_collects_all_readings() {
        let device = MockDevice::new()
            .with_utilization(80, 40)
            .with_encoder(10, 1000)
            .with_decoder(20, 2000)
            .with_temperature(66)
            .with_fan_speed(55);
        let loader = MockLoader::new(MockLibrary::with_devices(vec![device]));
        let monitor = open(&loader).unwrap();

        let snap = monitor.snapshot(0).unwrap();
        assert!(snap.is_complete());
        assert_eq!(snap.utilization, Some(Utilization::new(80, 40)));
        assert_eq!(snap.encoder, Some(EncoderUtilization::new(10, 1000)));
        assert_eq!(snap.decoder, Some(DecoderUtilization::new(20, 2000)));
        assert_eq!(snap.temperature, Some(Temperature::new(66)));
        assert_eq!(snap.fan_speed, Some(FanSpeed::new(55)));
    }

    #[test]
    fn test_snapshot_tolerates_single_failure() {
        let device = MockDevice::new().failing(
            Accessor::FanSpeed,
            NvmlError::NotSupported("passive cooling".to_string()),
        );
        let loader = MockLoader::new(MockLibrary::with_devices(vec![device]));
        let monitor = open(&loader).unwrap();

        let snap = monitor.snapshot(0).unwrap();
        assert_eq!(snap.fan_speed, None);
        assert!(snap.temperature.is_some());
        assert!(!snap.is_complete());
    }

    #[test]
    fn test_snapshot_out_of_range() {
        let loader = MockLoader::new(MockLibrary::new(1));
        let monitor = open(&loader).unwrap();

        assert!(matches!(
            monitor.snapshot(1),
            Err(MonitorError::IndexOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_independent_monitors_do_not_interfere() {
        let first = MockLoader::new(MockLibrary::new(1));
        let second = MockLoader::new(MockLibrary::new(2));

        let mut a = open(&first).unwrap();
        let b = open(&second).unwrap();
        a.close().unwrap();

        assert!(b.temperature(1).is_ok());
        assert_eq!(shutdowns(&second), 0);
    }

    #[test]
    fn test_monitor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GpuMonitor<MockLibrary>>();
        assert_send_sync::<GpuMonitor<NvmlLibrary>>();
    }
}
