//! Unified error types for gpumon
//!
//! This module defines all error types used throughout the crate.
//! Uses thiserror for ergonomic error definitions.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by the vendor library boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NvmlError {
    /// The shared library could not be opened
    #[error("NVML library could not be loaded: {0}. Is the NVIDIA driver installed?")]
    LibraryNotFound(String),

    /// The library opened but lacks a required entry point
    #[error("NVML entry point missing: {0}")]
    SymbolNotFound(String),

    /// A query was issued against a session that is not initialized
    #[error("NVML session is not initialized")]
    Uninitialized,

    /// NVIDIA kernel driver is not running
    #[error("NVIDIA driver not loaded")]
    DriverNotLoaded,

    /// Operation not supported by this GPU
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Insufficient permissions
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    /// Device not found at index
    #[error("GPU device not found at index {0}")]
    DeviceNotFound(u32),

    /// GPU is lost (fallen off bus, etc.)
    #[error("GPU is lost or has become inaccessible")]
    GpuLost,

    /// Invalid argument passed to NVML
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown NVML error
    #[error("NVML error: {0}")]
    Unknown(String),
}

impl From<nvml_wrapper::error::NvmlError> for NvmlError {
    fn from(err: nvml_wrapper::error::NvmlError) -> Self {
        use nvml_wrapper::error::NvmlError as NE;
        match err {
            NE::LibloadingError(e) => NvmlError::LibraryNotFound(e.to_string()),
            NE::Uninitialized => NvmlError::Uninitialized,
            NE::DriverNotLoaded => NvmlError::DriverNotLoaded,
            NE::NotSupported => {
                NvmlError::NotSupported("Operation not supported by this GPU".to_string())
            }
            NE::NoPermission => {
                NvmlError::InsufficientPermissions("Insufficient permissions".to_string())
            }
            NE::GpuLost => NvmlError::GpuLost,
            NE::InvalidArg => NvmlError::InvalidArgument("Invalid argument".to_string()),
            other => NvmlError::Unknown(other.to_string()),
        }
    }
}

/// Identifies which telemetry accessor issued a failing query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    GpuUtilization,
    EncoderUtilization,
    DecoderUtilization,
    Temperature,
    FanSpeed,
}

impl Accessor {
    /// Human-readable accessor name used in error messages
    pub const fn name(&self) -> &'static str {
        match self {
            Accessor::GpuUtilization => "gpu utilization",
            Accessor::EncoderUtilization => "encoder utilization",
            Accessor::DecoderUtilization => "decoder utilization",
            Accessor::Temperature => "temperature",
            Accessor::FanSpeed => "fan speed",
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from the monitor lifecycle and per-device queries
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Vendor library missing or incompatible
    #[error("failed to load NVML from {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: NvmlError,
    },

    /// Driver rejected initialization
    ///
    /// `source` is always the initialization failure; a failed best-effort
    /// shutdown afterwards is attached as `cleanup`.
    #[error("failed to initialize NVML: {source}{}", CleanupNote(.cleanup))]
    Init {
        #[source]
        source: NvmlError,
        cleanup: Option<NvmlError>,
    },

    /// Device count or handle fetch failed
    ///
    /// The session is rolled back before this is returned; a failed rollback
    /// shutdown is attached as `cleanup`.
    #[error(
        "failed to enumerate GPUs{}: {source}{}",
        IndexNote(.index),
        CleanupNote(.cleanup)
    )]
    Enumeration {
        index: Option<u32>,
        #[source]
        source: NvmlError,
        cleanup: Option<NvmlError>,
    },

    /// A telemetry accessor failed
    #[error("failed to get {accessor} of gpu {index}: {source}")]
    Query {
        index: u32,
        accessor: Accessor,
        #[source]
        source: NvmlError,
    },

    /// Device index is not below the enumerated device count
    #[error("gpu index {index} out of range ({count} devices)")]
    IndexOutOfRange { index: u32, count: u32 },

    /// The monitor was already closed
    #[error("monitor is closed")]
    Closed,

    /// Shutting down the vendor session failed
    #[error("failed to shutdown NVML: {source}")]
    Shutdown {
        #[source]
        source: NvmlError,
    },
}

impl MonitorError {
    /// Device index this error refers to, if any
    pub fn device_index(&self) -> Option<u32> {
        match self {
            MonitorError::Enumeration { index, .. } => *index,
            MonitorError::Query { index, .. } | MonitorError::IndexOutOfRange { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }

    /// Accessor this error refers to, if any
    pub fn accessor(&self) -> Option<Accessor> {
        match self {
            MonitorError::Query { accessor, .. } => Some(*accessor),
            _ => None,
        }
    }
}

struct CleanupNote<'a>(&'a Option<NvmlError>);

impl fmt::Display for CleanupNote<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(e) => write!(f, " (cleanup also failed: {})", e),
            None => Ok(()),
        }
    }
}

struct IndexNote<'a>(&'a Option<u32>);

impl fmt::Display for IndexNote<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(i) => write!(f, " (device {})", i),
            None => Ok(()),
        }
    }
}

/// Errors from configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias using MonitorError
pub type Result<T> = std::result::Result<T, MonitorError>;
