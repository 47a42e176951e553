//! Configuration system
//!
//! Handles TOML config file parsing and environment overrides.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::nvml::DEFAULT_LIBRARY;

/// Environment variable overriding the NVML library path
pub const LIBRARY_PATH_ENV: &str = "GPUMON_LIBRARY_PATH";

/// Monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Path to the NVML shared library. The platform default is used when unset.
    pub library_path: Option<PathBuf>,
}

impl MonitorConfig {
    /// Library path to load, falling back to the platform default
    pub fn resolved_library_path(&self) -> PathBuf {
        self.library_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY))
    }
}
