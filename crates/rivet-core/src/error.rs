//! Unified error types for the Rivet core.
//!
//! Command-level errors (user input, remote refusals) live in
//! `rivet-framework`; this module only covers the session boundary and the
//! wait primitives.

use thiserror::Error;

// =============================================================================
// Session Errors
// =============================================================================

/// Errors raised at the session capability boundary.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// No live session is attached to the supervisor.
    #[error("session is not connected")]
    NotConnected,

    /// The connector could not open a session.
    #[error("failed to connect to {endpoint}: {reason}")]
    ConnectFailed {
        /// Remote endpoint that refused the connection.
        endpoint: String,
        /// Reason reported by the connector.
        reason: String,
    },

    /// An outbound chat line could not be delivered.
    #[error("failed to send chat: {0}")]
    SendFailed(String),

    /// The session was closed while the operation was in flight.
    #[error("session closed")]
    Closed,
}

impl SessionError {
    /// Creates a connection failure for `endpoint`.
    pub fn connect_failed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectFailed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Wait Errors
// =============================================================================

/// Errors produced by the [`wait`](crate::wait) primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The deadline elapsed before the condition held.
    #[error("timed out")]
    Timeout,

    /// The notification stream closed before a matching payload arrived.
    #[error("notification stream closed")]
    Closed,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for wait operations.
pub type WaitResult<T> = Result<T, WaitError>;
