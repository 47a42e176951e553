//! Configuration file loading
//!
//! Handles loading configuration from TOML files.

use crate::config::MonitorConfig;
use crate::error::ConfigError;

use std::path::{Path, PathBuf};

/// Configuration file handler
pub struct ConfigFile;

impl ConfigFile {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MonitorConfig, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let config: MonitorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// The first existing file that parses wins; a file that fails to parse
    /// is logged and skipped.
    pub fn load_default() -> Option<MonitorConfig> {
        for path in Self::default_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return Some(config);
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Get default configuration file paths
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/gpumon/config.toml"));

        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("gpumon").join("config.toml"));
        }

        paths.push(PathBuf::from("gpumon.toml"));

        paths
    }
}
