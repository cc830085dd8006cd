//! Error taxonomy for the dashboard core.
//!
//! [`SourceError`] is transient: the scheduler turns it into
//! `status = Error` and polls again on the next tick. [`ConfigError`] is
//! fatal and aborts startup before the scheduler exists.

use std::time::Duration;

use crate::domain::ParameterName;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("sample timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no threshold configured for parameter `{0}`")]
    MissingParameter(ParameterName),

    #[error("threshold for `{name}` must be a finite number, got {value}")]
    InvalidThreshold { name: ParameterName, value: f64 },

    #[error("unit for `{0}` must not be empty")]
    EmptyUnit(ParameterName),

    #[error("invalid display colour `{0}` (expected #rrggbb)")]
    InvalidColor(String),

    #[error("{0} must be greater than zero")]
    InvalidInterval(&'static str),

    #[error("invalid server bind address `{0}`")]
    InvalidBind(String),
}
