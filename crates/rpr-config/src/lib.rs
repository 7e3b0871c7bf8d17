//! Configuration for the rpr marshaling layer
//!
//! Provides configuration management for the binding layer:
//! - Bridge configuration (rpr.toml)
//! - Environment variable overrides (RPR_*)
//! - Validation of buffer and dispatch limits
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults (4 MiB string buffers, queue depth 64)
//! 2. Bridge config (./rpr.toml, searched upwards)
//! 3. Environment variables (RPR_*)
//!
//! # Example
//!
//! ```no_run
//! use rpr_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! assert!(config.default_capacity() > 0);
//! ```

pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Name of the configuration file looked up by [`ConfigLoader`]
pub const CONFIG_FILE_NAME: &str = "rpr.toml";

pub use loader::{Config, ConfigLoader};
pub use settings::{
    BridgeConfig, BufferConfig, DispatchConfig, HostConfig, LoggingConfig,
    DEFAULT_QUEUE_DEPTH, MAX_STRBUF,
};
