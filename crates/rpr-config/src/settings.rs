//! Bridge Configuration (rpr.toml)
//!
//! Every section and key is optional; missing values fall back to the
//! built-in defaults.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default capacity of string buffers handed to native code (4 MiB)
pub const MAX_STRBUF: usize = 4 * 1024 * 1024;

/// Default number of jobs that may wait for the host context
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Bridge configuration from rpr.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// String buffer settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffers: Option<BufferConfig>,

    /// Native host settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostConfig>,

    /// Host context dispatch settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchConfig>,

    /// Logging settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// String buffer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    /// Capacity in bytes used when a parameter declares no size (default: 4 MiB)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_capacity: Option<usize>,
}

/// Native host settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Shared library exporting the host's entry points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,
}

/// Host context dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Bound of the forwarded-call queue (default: 64)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<usize>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "rpr_marshal=debug"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl BridgeConfig {
    /// Load bridge configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the bridge configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(capacity) = self.buffers.as_ref().and_then(|b| b.default_capacity) {
            if capacity == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "buffers.default_capacity".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if let Some(depth) = self.dispatch.as_ref().and_then(|d| d.queue_depth) {
            if depth == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "dispatch.queue_depth".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if let Some(filter) = self.logging.as_ref().and_then(|l| l.filter.as_deref()) {
            if filter.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "logging.filter".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Effective default buffer capacity
    pub fn default_capacity(&self) -> usize {
        self.buffers
            .as_ref()
            .and_then(|b| b.default_capacity)
            .unwrap_or(MAX_STRBUF)
    }

    /// Effective dispatch queue depth
    pub fn queue_depth(&self) -> usize {
        self.dispatch
            .as_ref()
            .and_then(|d| d.queue_depth)
            .unwrap_or(DEFAULT_QUEUE_DEPTH)
    }

    /// Host library path, if configured
    pub fn host_library(&self) -> Option<&Path> {
        self.host.as_ref().and_then(|h| h.library.as_deref())
    }

    /// Logging filter directive, if configured
    pub fn log_filter(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.filter.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.default_capacity(), 4 * 1024 * 1024);
        assert_eq!(config.queue_depth(), DEFAULT_QUEUE_DEPTH);
        assert_eq!(config.host_library(), None);
        assert_eq!(config.log_filter(), None);
    }

    #[test]
    fn test_parse_all_sections() {
        let config: BridgeConfig = toml::from_str(
            r#"
[buffers]
default_capacity = 1024

[host]
library = "/opt/host/libshim.so"

[dispatch]
queue_depth = 8

[logging]
filter = "rpr_marshal=trace"
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.default_capacity(), 1024);
        assert_eq!(config.queue_depth(), 8);
        assert_eq!(config.host_library(), Some(Path::new("/opt/host/libshim.so")));
        assert_eq!(config.log_filter(), Some("rpr_marshal=trace"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config: BridgeConfig = toml::from_str("[buffers]\ndefault_capacity = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "buffers.default_capacity"
        ));
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        let config: BridgeConfig = toml::from_str("[dispatch]\nqueue_depth = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<BridgeConfig, _> = toml::from_str("[buffers]\nsize = 10\n");
        assert!(result.is_err());
    }
}
