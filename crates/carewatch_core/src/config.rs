//! Monitoring configuration.
//!
//! # Responsibility
//! - Hold tunables for blink cadence and background sampling.
//! - Load them from JSON with every field defaulted.
//!
//! # Invariants
//! - A config returned by `from_json_str`/`load_from_path` is validated.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

const DEFAULT_BLINK_INTERVAL_MS: u64 = 500;
const DEFAULT_MIN_DISTANCE_METERS: f64 = 10.0;
const DEFAULT_MIN_INTERVAL_MS: u64 = 5_000;

/// Location accuracy requested from the platform sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingAccuracy {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
}

/// Options passed to `BackgroundSampler::start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    pub accuracy: SamplingAccuracy,
    pub min_distance_meters: f64,
    pub min_interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            accuracy: SamplingAccuracy::High,
            min_distance_meters: DEFAULT_MIN_DISTANCE_METERS,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
        }
    }
}

/// Session-wide tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub blink_interval_ms: u64,
    pub background: SamplerConfig,
    /// Forward background samples into the monitor as position updates.
    /// When `false` the background task only keeps the OS collection alive.
    pub background_updates_position: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            blink_interval_ms: DEFAULT_BLINK_INTERVAL_MS,
            background: SamplerConfig::default(),
            background_updates_position: false,
        }
    }
}

impl MonitorConfig {
    /// Parses and validates a JSON config. Missing fields take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blink_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "blink_interval_ms must be greater than 0".to_string(),
            ));
        }
        let distance = self.background.min_distance_meters;
        if !distance.is_finite() || distance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "background.min_distance_meters must be a non-negative number, got {distance}"
            )));
        }
        if self.background.min_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "background.min_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }
}

/// Config load/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "failed to read config `{path}`: {message}"),
            Self::Parse(message) => write!(f, "invalid config JSON: {message}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, MonitorConfig, SamplingAccuracy};
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = MonitorConfig::from_json_str("{}").expect("defaults should parse");
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.blink_interval(), Duration::from_millis(500));
        assert_eq!(config.background.accuracy, SamplingAccuracy::High);
        assert_eq!(config.background.min_distance_meters, 10.0);
        assert_eq!(config.background.min_interval_ms, 5_000);
        assert!(!config.background_updates_position);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = MonitorConfig::from_json_str(
            r#"{"background": {"accuracy": "balanced"}, "background_updates_position": true}"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.background.accuracy, SamplingAccuracy::Balanced);
        assert_eq!(config.background.min_interval_ms, 5_000);
        assert!(config.background_updates_position);
    }

    #[test]
    fn rejects_zero_intervals_and_unknown_fields() {
        let err = MonitorConfig::from_json_str(r#"{"blink_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = MonitorConfig::from_json_str(r#"{"background": {"min_interval_ms": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = MonitorConfig::from_json_str(r#"{"blink": 1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"blink_interval_ms": 250}}"#).expect("write config");

        let config = MonitorConfig::load_from_path(file.path()).expect("config should load");
        assert_eq!(config.blink_interval(), Duration::from_millis(250));

        let missing = file.path().with_extension("missing");
        let err = MonitorConfig::load_from_path(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
