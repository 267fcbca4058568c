//! Core error types for gestured-core.
//!
//! Engine operations never surface these to their callers: sensor failures
//! are logged and absorbed by the detector that hit them. Errors only reach
//! callers from configuration handling and trace loading.

use std::path::PathBuf;
use thiserror::Error;

use crate::sensor::{SensorChannel, SubscriptionId};

/// Core error type for gestured-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Sensor source errors
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A replay trace line could not be decoded
    #[error("Invalid trace event on line {line}: {source}")]
    Trace {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`SensorSource`](crate::sensor::SensorSource).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The hardware does not expose this channel
    #[error("Sensor channel '{channel}' is unavailable")]
    ChannelUnavailable { channel: SensorChannel },

    /// Unsubscribe was called with an id the source does not know
    #[error("Unknown sensor subscription {0:?}")]
    UnknownSubscription(SubscriptionId),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration schema
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home/config directory could not be prepared
    #[error("Config directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
