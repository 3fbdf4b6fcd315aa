//! Error types for modules and chat commands.

use rivet_core::{SessionError, WaitError};
use thiserror::Error;

/// A type-erased error for failures that should not reach chat.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── CommandError ─────────────────────────────────────────────────────────────

/// Failure reported by a command handler.
///
/// How a failure is surfaced to the player depends on the variant:
///
/// | variant | reply sent to the sender |
/// |---------|--------------------------|
/// | `User` | the message, verbatim |
/// | `Remote` | the message, verbatim |
/// | `Timeout` | `"Timed out waiting for a response."` |
/// | `Internal` | nothing; the error is logged |
#[derive(Debug, Error)]
pub enum CommandError {
    /// The player supplied bad input.
    #[error("{0}")]
    User(String),

    /// The remote server refused or reported a problem.
    #[error("{0}")]
    Remote(String),

    /// A wait inside the handler ran past its deadline.
    #[error("Timed out waiting for a response.")]
    Timeout,

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(#[source] BoxError),
}

impl CommandError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }

    /// Returns the text to send back to the player, if the failure is meant
    /// to be seen.
    pub fn reply_text(&self) -> Option<String> {
        match self {
            Self::Internal(_) => None,
            other => Some(other.to_string()),
        }
    }
}

impl From<SessionError> for CommandError {
    fn from(err: SessionError) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<WaitError> for CommandError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout => Self::Timeout,
            WaitError::Closed => Self::Internal(Box::new(err)),
        }
    }
}

// ─── ModuleError ──────────────────────────────────────────────────────────────

/// Errors raised while installing or setting up modules.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A module with the same tag is already installed.
    #[error("module `{tag}` is already installed")]
    Duplicate { tag: &'static str },

    /// A module's setup hook failed.
    #[error("module `{tag}` setup failed: {reason}")]
    Setup { tag: &'static str, reason: String },
}

impl ModuleError {
    pub fn setup(tag: &'static str, reason: impl ToString) -> Self {
        Self::Setup {
            tag,
            reason: reason.to_string(),
        }
    }
}

/// Result type for command handlers.
pub type CommandResult = Result<(), CommandError>;

/// Result type for module operations.
pub type ModuleResult<T = ()> = Result<T, ModuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text_by_variant() {
        assert_eq!(
            CommandError::user("Usage: /pay <amount>").reply_text().as_deref(),
            Some("Usage: /pay <amount>")
        );
        assert_eq!(
            CommandError::remote("Insufficient funds").reply_text().as_deref(),
            Some("Insufficient funds")
        );
        assert_eq!(
            CommandError::Timeout.reply_text().as_deref(),
            Some("Timed out waiting for a response.")
        );
        assert_eq!(CommandError::internal("db exploded").reply_text(), None);
    }

    #[test]
    fn test_wait_error_conversion() {
        assert!(matches!(
            CommandError::from(WaitError::Timeout),
            CommandError::Timeout
        ));
        assert!(matches!(
            CommandError::from(WaitError::Closed),
            CommandError::Internal(_)
        ));
    }
}
