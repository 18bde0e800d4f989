//! Core error types for notigate-core.
//!
//! Policy denials are not errors; they are returned as
//! [`Denial`](crate::admission::Denial) values. The types here cover the
//! collaborators that can actually fail: the state store, the configuration
//! file and the delivery channel.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for notigate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable state errors
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by a [`StateStore`](crate::storage::StateStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading the backing file failed
    #[error("Failed to read state from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the backing file failed
    #[error("Failed to write state to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored state could not be decoded
    #[error("Corrupt state in {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// The data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Errors reported by a [`DeliveryChannel`](crate::channel::DeliveryChannel).
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The channel refused the notification
    #[error("Channel '{channel}' rejected notification: {message}")]
    Rejected { channel: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
