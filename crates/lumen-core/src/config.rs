//! Configuration for the enhancement pipeline.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults when no file exists. All structs implement `Default` and accept
//! partial TOML via `#[serde(default)]`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Root configuration structure for Lumen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Background worker settings
    pub worker: WorkerConfig,

    /// Output encoding settings
    pub encoding: EncodingConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Background worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Whether background execution may be used at all
    pub enabled: bool,

    /// Per-request reply deadline in milliseconds
    pub timeout_ms: u64,

    /// Max requests queued to the worker before dispatch waits
    pub queue_depth: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 30_000,
            queue_depth: 16,
        }
    }
}

impl WorkerConfig {
    /// Reply deadline as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories, falling back to
    /// `~/.lumen/config.toml` if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "lumen", "lumen")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".lumen").join("config.toml")
            })
    }

    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "worker.timeout_ms must be > 0".into(),
            ));
        }
        if self.worker.queue_depth == 0 {
            return Err(ConfigError::ValidationError(
                "worker.queue_depth must be > 0".into(),
            ));
        }
        if self.encoding.jpeg_quality == 0 || self.encoding.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "encoding.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.worker.enabled);
        assert_eq!(config.worker.timeout_ms, 30_000);
        assert_eq!(config.encoding.jpeg_quality, 95);
    }

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.worker.timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut config = Config::default();
        config.encoding.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.encoding.jpeg_quality = 101;
        assert!(config.validate().is_err());
        config.encoding.jpeg_quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[worker]\ntimeout_ms = 500").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.worker.timeout_ms, 500);
        // Unspecified sections keep their defaults
        assert_eq!(config.encoding.jpeg_quality, 95);
    }

    #[test]
    fn test_load_from_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker = 12").unwrap();

        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_worker_timeout_duration() {
        let config = WorkerConfig {
            timeout_ms: 1500,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_millis(1500));
    }
}
