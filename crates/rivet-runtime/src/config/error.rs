//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading, validation and
/// saving.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Failed to read or write the configuration file.
    #[error("Configuration file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The merged sources did not match the schema.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// The document could not be serialized for saving.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// Missing required field.
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Two bots share an identity.
    #[error("Duplicate bot identity: {0}")]
    DuplicateIdentity(String),
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
