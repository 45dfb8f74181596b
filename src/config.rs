//! Configuration for the runner and the `zfs-exec` binary.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Args;
use crate::execution::{RunnerOptions, INPUT_CHUNK_SIZE};

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runner tunables.
    pub runner: RunnerSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Runner configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    /// Timeout in seconds for requests that do not set one.
    pub timeout_secs: Option<u64>,
    /// Exit polling interval for local commands, in milliseconds.
    pub poll_interval_ms: u64,
    /// Bound on the output drain after a timed out command is killed.
    pub drain_timeout_ms: u64,
    /// Input chunk size in bytes.
    pub input_chunk_size: usize,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            poll_interval_ms: 10,
            drain_timeout_ms: 1000,
            input_chunk_size: INPUT_CHUNK_SIZE,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log filter (error, warn, info, debug, trace or a full directive).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var("ZFS_EXEC_TIMEOUT") {
            self.runner.timeout_secs = Some(parse_timeout(&value)?);
        }

        if let Ok(level) = std::env::var("ZFS_EXEC_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(secs) = args.timeout {
            self.runner.timeout_secs = Some(secs);
        }
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env()?;
        config.apply_args(args);
        Ok(config)
    }

    /// Validate the runner section and convert it to [`RunnerOptions`].
    pub fn to_runner_options(&self) -> Result<RunnerOptions, ConfigError> {
        let runner = &self.runner;
        if runner.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be non-zero"));
        }
        if runner.input_chunk_size == 0 {
            return Err(ConfigError::Invalid("input_chunk_size must be non-zero"));
        }

        Ok(RunnerOptions {
            default_timeout: runner.timeout_secs.map(Duration::from_secs),
            poll_interval: Duration::from_millis(runner.poll_interval_ms),
            drain_timeout: Duration::from_millis(runner.drain_timeout_ms),
            input_chunk_size: runner.input_chunk_size,
        })
    }

    /// Get the log filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

fn parse_timeout(value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidTimeout(value.to_string()))
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid runner configuration: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.runner.timeout_secs, None);
        assert_eq!(config.runner.poll_interval_ms, 10);
        assert_eq!(config.runner.input_chunk_size, 131072);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_config_partial_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "runner": { "timeout_secs": 60 } }"#)
            .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.runner.timeout_secs, Some(60));
        assert_eq!(config.runner.drain_timeout_ms, 1000);
    }

    #[test]
    fn test_config_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ runner: ").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn test_config_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/zfs-exec.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/zfs-exec.json"));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            timeout: Some(5),
            log_level: Some("debug".into()),
            ..Args::default()
        };
        config.apply_args(&args);

        assert_eq!(config.runner.timeout_secs, Some(5));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_apply_args_keeps_unset() {
        let mut config = Config::default();
        config.runner.timeout_secs = Some(30);
        config.apply_args(&Args::default());
        assert_eq!(config.runner.timeout_secs, Some(30));
    }

    #[test]
    fn test_to_runner_options() {
        let mut config = Config::default();
        config.runner.timeout_secs = Some(2);
        config.runner.poll_interval_ms = 25;

        let options = config.to_runner_options().unwrap();
        assert_eq!(options.default_timeout, Some(Duration::from_secs(2)));
        assert_eq!(options.poll_interval, Duration::from_millis(25));
        assert_eq!(options.input_chunk_size, INPUT_CHUNK_SIZE);
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = Config::default();
        config.runner.poll_interval_ms = 0;
        assert!(config.to_runner_options().is_err());

        let mut config = Config::default();
        config.runner.input_chunk_size = 0;
        assert!(config.to_runner_options().is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(" 15 ").unwrap(), 15);
        assert!(matches!(
            parse_timeout("soon"),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"poll_interval_ms\""));
        assert!(json.contains("\"level\""));
    }
}
