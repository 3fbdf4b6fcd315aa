//! Runtime error types.

use rivet_core::SessionError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The session could not be opened or used.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No supervisor is registered for this identity.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
