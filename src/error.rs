//! Error types for the dull ticker and its utilities.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid ticker or limiter configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A duration string could not be parsed.
    #[error("cannot parse duration {input:?}: {reason}")]
    Duration { input: String, reason: String },

    /// The ticker loop is no longer running.
    #[error("dull ticker has been stopped")]
    Stopped,

    /// IO error while loading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn duration(input: &str, reason: impl Into<String>) -> Self {
        Self::Duration {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for ticker operations.
pub type Result<T> = std::result::Result<T, Error>;
