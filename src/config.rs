//! Configuration for the stride agent.

use crate::core::{DetectorConfig, TrackerConfig, STEP_LENGTH_M};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Step detection parameters
    pub detector: DetectorConfig,

    /// Length of one step in meters, used for the distance estimate
    pub step_length_m: f64,

    /// Stop and exit once a replayed trace has been fully delivered
    pub exit_when_exhausted: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            step_length_m: STEP_LENGTH_M,
            exit_when_exhausted: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stride-agent")
            .join("config.json")
    }

    /// Reject values the detector or distance estimate cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_length_m.is_finite() && self.step_length_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "step_length_m must be positive, got {}",
                self.step_length_m
            )));
        }
        if !(self.detector.acceleration_threshold.is_finite()
            && self.detector.acceleration_threshold >= 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "acceleration_threshold must be non-negative, got {}",
                self.detector.acceleration_threshold
            )));
        }
        if self.detector.step_debounce_ms < 0 {
            return Err(ConfigError::Invalid(format!(
                "step_debounce_ms must be non-negative, got {}",
                self.detector.step_debounce_ms
            )));
        }
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            detector: self.detector.clone(),
            step_length_m: self.step_length_m,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.detector.acceleration_threshold, 1.25);
        assert_eq!(config.detector.step_debounce_ms, 200);
        assert!(config.detector.prime_first_sample);
        assert_eq!(config.step_length_m, 0.76);
        assert!(!config.exit_when_exhausted);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            step_length_m: 0.7,
            exit_when_exhausted: true,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"detector": {"step_debounce_ms": 300}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.detector.step_debounce_ms, 300);
        assert_eq!(config.detector.acceleration_threshold, 1.25);
        assert_eq!(config.step_length_m, 0.76);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"step_length_m": 0.0}"#).unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
