//! Configuration builder
//!
//! Merges configuration from files and the environment.

use std::path::{Path, PathBuf};

use crate::config::{ConfigFile, MonitorConfig, LIBRARY_PATH_ENV};

/// Builder for merging configuration sources
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: MonitorConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file, or from the default locations when
    /// `path` is `None`
    pub fn with_file(mut self, path: Option<&Path>) -> Self {
        let file_config = match path {
            Some(path) => match ConfigFile::load(path) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            },
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        self
    }

    /// Override with an explicit library path
    pub fn with_library_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(p) = path {
            self.config.library_path = Some(p);
        }
        self
    }

    /// Override with `GPUMON_LIBRARY_PATH` if set
    pub fn with_env(self) -> Self {
        let path = std::env::var_os(LIBRARY_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.with_library_path(path)
    }

    /// Build the final configuration
    pub fn build(self) -> MonitorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_default() {
        let config = ConfigBuilder::new().build();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_explicit_path_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"library_path = "/from/file.so""#).unwrap();

        let config = ConfigBuilder::new()
            .with_file(Some(file.path()))
            .with_library_path(Some(PathBuf::from("/from/override.so")))
            .build();
        assert_eq!(config.resolved_library_path(), PathBuf::from("/from/override.so"));
    }

    #[test]
    fn test_missing_override_keeps_file_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"library_path = "/from/file.so""#).unwrap();

        let config = ConfigBuilder::new()
            .with_file(Some(file.path()))
            .with_library_path(None)
            .build();
        assert_eq!(config.resolved_library_path(), PathBuf::from("/from/file.so"));
    }

    #[test]
    fn test_unreadable_file_keeps_defaults() {
        let config = ConfigBuilder::new()
            .with_file(Some(Path::new("/nonexistent/gpumon.toml")))
            .build();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let saved = std::env::var_os(LIBRARY_PATH_ENV);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"library_path = "/from/file.so""#).unwrap();

        std::env::set_var(LIBRARY_PATH_ENV, "/from/env.so");
        let config = ConfigBuilder::new()
            .with_file(Some(file.path()))
            .with_env()
            .build();
        assert_eq!(config.resolved_library_path(), PathBuf::from("/from/env.so"));

        // An empty value is treated as unset
        std::env::set_var(LIBRARY_PATH_ENV, "");
        let config = ConfigBuilder::new()
            .with_file(Some(file.path()))
            .with_env()
            .build();
        assert_eq!(config.resolved_library_path(), PathBuf::from("/from/file.so"));

        match saved {
            Some(value) => std::env::set_var(LIBRARY_PATH_ENV, value),
            None => std::env::remove_var(LIBRARY_PATH_ENV),
        }
    }
}
