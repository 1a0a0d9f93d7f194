//! # Error Types
//!
//! Custom error types for the ground station engine using `thiserror`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the ground station engine
#[derive(Debug, Error)]
pub enum GroundStationError {
    /// Operator submitted a blank or whitespace-only command
    #[error("Command text is empty")]
    EmptyCommand,

    /// Export destination could not be written
    #[error("Failed to write {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// A sample was offered to the session log out of order
    #[error("Packet out of sequence: expected {expected}, got {actual}")]
    PacketOutOfSequence { expected: u32, actual: u32 },

    /// Sampling was started outside a tokio runtime
    #[error("No tokio runtime available to drive sampling")]
    NoRuntime,

    /// A sample source failed to produce a reading
    #[error("Sample source error: {0}")]
    Source(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GroundStationError {
    /// Wraps an I/O error with the path it happened on.
    pub(crate) fn io_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for the ground station engine
pub type Result<T> = std::result::Result<T, GroundStationError>;
