//! The host interface modules and commands act through.
//!
//! A host is whatever owns the session: in practice the runtime's
//! `Supervisor`. Modules never hold on to a session handle. They ask the
//! host for the current one each time, because reconnects replace it.

use std::sync::Arc;

use async_trait::async_trait;
use rivet_core::{BoxedSession, SessionError, SessionResult};

/// Shared handle to a [`Host`].
pub type SharedHost = Arc<dyn Host>;

#[async_trait]
pub trait Host: Send + Sync + 'static {
    /// The account name this host supervises.
    fn identity(&self) -> String;

    /// The current live session, if any.
    fn session(&self) -> Option<BoxedSession>;

    /// Returns true if `user` is on the allow-list.
    fn check_allow_list(&self, user: &str) -> bool;

    /// Sends a private message to `user`.
    ///
    /// When `enforce_allow_list` is set and `user` is not allowed, nothing is
    /// sent and the call succeeds.
    async fn tell(&self, user: &str, text: &str, enforce_allow_list: bool) -> SessionResult<()>;

    /// Sends a server command through the current session.
    async fn send_command(&self, text: &str) -> SessionResult<()> {
        let session = self.session().ok_or(SessionError::NotConnected)?;
        session.send_command(text).await
    }
}
