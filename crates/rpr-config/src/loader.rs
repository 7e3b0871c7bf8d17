//! Configuration Loader
//!
//! Handles loading configuration and applying environment overrides with proper precedence.

use crate::settings::{BridgeConfig, BufferConfig, DispatchConfig, HostConfig, LoggingConfig};
use crate::{ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Loads configuration and merges it with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Bridge config (./rpr.toml) - overrides defaults
/// 3. Environment variables (RPR_*) - overrides the file
#[derive(Debug, Default)]
pub struct ConfigLoader;

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Bridge configuration
    pub bridge: BridgeConfig,

    /// Directory containing the rpr.toml that was loaded
    pub config_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find rpr.toml. A missing file is not
    /// an error: the defaults (plus environment overrides) are returned.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (config_root, bridge) = self.find_bridge_config(start_dir)?;
        let bridge = self.apply_env_overrides(bridge)?;

        Ok(Config {
            bridge,
            config_root,
        })
    }

    /// Load configuration from a specific config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let bridge = BridgeConfig::load_from_file(config_path)?;
        let bridge = self.apply_env_overrides(bridge)?;

        Ok(Config {
            bridge,
            config_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find bridge configuration by walking up directory tree
    fn find_bridge_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, BridgeConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let bridge = BridgeConfig::load_from_file(&config_path)?;
                return Ok((Some(current), bridge));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, BridgeConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Recognised variables: RPR_DEFAULT_CAPACITY, RPR_QUEUE_DEPTH,
    /// RPR_HOST_LIBRARY, RPR_LOG.
    fn apply_env_overrides(&self, mut config: BridgeConfig) -> ConfigResult<BridgeConfig> {
        if let Ok(raw) = env::var("RPR_DEFAULT_CAPACITY") {
            let capacity = parse_usize("RPR_DEFAULT_CAPACITY", &raw)?;
            config
                .buffers
                .get_or_insert_with(BufferConfig::default)
                .default_capacity = Some(capacity);
        }

        if let Ok(raw) = env::var("RPR_QUEUE_DEPTH") {
            let depth = parse_usize("RPR_QUEUE_DEPTH", &raw)?;
            config
                .dispatch
                .get_or_insert_with(DispatchConfig::default)
                .queue_depth = Some(depth);
        }

        if let Ok(library) = env::var("RPR_HOST_LIBRARY") {
            config.host.get_or_insert_with(HostConfig::default).library =
                Some(PathBuf::from(library));
        }

        if let Ok(filter) = env::var("RPR_LOG") {
            config
                .logging
                .get_or_insert_with(LoggingConfig::default)
                .filter = Some(filter);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_usize(field: &str, raw: &str) -> ConfigResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

impl Config {
    /// Capacity used for buffers without a declared size
    pub fn default_capacity(&self) -> usize {
        self.bridge.default_capacity()
    }

    /// Bound of the host dispatch queue
    pub fn queue_depth(&self) -> usize {
        self.bridge.queue_depth()
    }

    /// Host library path; relative paths are resolved against the config root
    pub fn host_library(&self) -> Option<PathBuf> {
        let library = self.bridge.host_library()?;
        match &self.config_root {
            Some(root) if library.is_relative() => Some(root.join(library)),
            _ => Some(library.to_path_buf()),
        }
    }

    /// Logging filter directive
    pub fn log_filter(&self) -> Option<&str> {
        self.bridge.log_filter()
    }

    /// Check whether an rpr.toml was found
    pub fn has_config_file(&self) -> bool {
        self.config_root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[buffers]\ndefault_capacity = 256\n");

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let config = ConfigLoader::new().load_from_directory(&sub_dir).unwrap();

        assert_eq!(config.default_capacity(), 256);
        assert_eq!(config.config_root.as_deref(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_relative_library_resolved_against_root() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[host]\nlibrary = \"lib/shim.so\"\n");

        let config = ConfigLoader::new()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(
            config.host_library(),
            Some(temp_dir.path().join("lib").join("shim.so"))
        );
    }

    #[test]
    #[serial]
    fn test_env_override_capacity() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[buffers]\ndefault_capacity = 256\n");

        env::set_var("RPR_DEFAULT_CAPACITY", "512");
        let config = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("RPR_DEFAULT_CAPACITY");

        assert_eq!(config.unwrap().default_capacity(), 512);
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_number() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("RPR_QUEUE_DEPTH", "many");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("RPR_QUEUE_DEPTH");

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
