//! Configuration for dull tickers.
//!
//! Durations are written as human-readable strings (`"10s"`, `"30m"`) and
//! validated before a ticker is spawned.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::duration::{format_duration, parse_positive_duration};
use crate::error::{Error, Result};

/// Default minimum step interval.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(10);
/// Default maximum step interval.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30 * 60);
/// Default idle duration before a pending touch is force-flushed.
pub const DEFAULT_RESET_DURATION: Duration = Duration::from_secs(3 * 60);

/// Minimum intervals at or above this poll once a second, finer ones every 100ms.
pub const COARSE_POLL_THRESHOLD: Duration = Duration::from_secs(2);
const COARSE_POLL: Duration = Duration::from_secs(1);
const FINE_POLL: Duration = Duration::from_millis(100);

/// Timing configuration of a dull ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DullConfig {
    /// Floor of the step interval.
    #[serde(
        default = "default_min_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub min_interval: Duration,
    /// Ceiling of the step interval; zero means unbounded.
    #[serde(
        default = "default_max_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub max_interval: Duration,
    /// Idle time after which a pending touch is flushed and backoff restarts.
    #[serde(
        default = "default_reset_duration",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub reset_duration: Duration,
}

fn default_min_interval() -> Duration {
    DEFAULT_MIN_INTERVAL
}

fn default_max_interval() -> Duration {
    DEFAULT_MAX_INTERVAL
}

fn default_reset_duration() -> Duration {
    DEFAULT_RESET_DURATION
}

fn serialize_duration<S: Serializer>(d: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*d))
}

fn deserialize_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_positive_duration(&raw).map_err(serde::de::Error::custom)
}

impl Default for DullConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            reset_duration: DEFAULT_RESET_DURATION,
        }
    }
}

impl DullConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Loads a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Loads configuration from environment variables.
    ///
    /// - `DULL_MIN_INTERVAL`
    /// - `DULL_MAX_INTERVAL`
    /// - `DULL_RESET_DURATION`
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = lookup("DULL_MIN_INTERVAL") {
            config.min_interval = parse_positive_duration(&v)?;
        }
        if let Some(v) = lookup("DULL_MAX_INTERVAL") {
            config.max_interval = parse_positive_duration(&v)?;
        }
        if let Some(v) = lookup("DULL_RESET_DURATION") {
            config.reset_duration = parse_positive_duration(&v)?;
        }
        Ok(config)
    }

    /// Period of the internal poll ticker for this configuration.
    pub fn poll_period(&self) -> Duration {
        if self.min_interval >= COARSE_POLL_THRESHOLD {
            COARSE_POLL
        } else {
            FINE_POLL
        }
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

impl Validate for DullConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.min_interval.is_zero() {
            result.add_error("min_interval must be greater than zero");
        }

        if !self.max_interval.is_zero() && self.max_interval < self.min_interval {
            result.add_error(format!(
                "max_interval ({:?}) must not be less than min_interval ({:?})",
                self.max_interval, self.min_interval
            ));
        }

        if self.reset_duration.is_zero() {
            result.add_warning("reset_duration of zero flushes every touch on the next poll");
        }

        if !self.min_interval.is_zero() && self.min_interval < self.poll_period() {
            result.add_warning(format!(
                "min_interval {:?} is finer than the poll period {:?}",
                self.min_interval,
                self.poll_period()
            ));
        }

        result
    }
}
