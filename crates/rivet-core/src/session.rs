//! The session capability interface.
//!
//! A session is the external game client a [`Supervisor`] owns. Rivet never
//! speaks the remote protocol itself; it consumes a session through the
//! narrow [`Session`] trait and opens new ones through a
//! [`SessionConnector`].
//!
//! Notifications arrive on a [`tokio::sync::broadcast`] stream. Every
//! subscriber gets its own receiver, and dropping the receiver is how a
//! listener unsubscribes.
//!
//! [`Supervisor`]: https://docs.rs/rivet-runtime

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::SessionResult;

/// Capacity used for session event channels.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A receiving end of a session's event stream.
pub type EventStream = broadcast::Receiver<SessionEvent>;

/// A type-erased session handle shared between the supervisor and its
/// modules.
pub type BoxedSession = Arc<dyn Session>;

// =============================================================================
// Events
// =============================================================================

/// Where a chat line was rendered on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatPosition {
    /// Regular chat box.
    #[default]
    Chat,
    /// System message area.
    System,
    /// Action bar above the hotbar.
    GameInfo,
}

/// A single rendered chat line delivered by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    /// Plain text of the line with formatting stripped.
    pub text: String,
    /// Where the line was shown.
    #[serde(default)]
    pub position: ChatPosition,
}

impl ChatLine {
    /// Creates a regular chat line.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: ChatPosition::Chat,
        }
    }

    /// Creates a line with an explicit position.
    pub fn with_position(text: impl Into<String>, position: ChatPosition) -> Self {
        Self {
            text: text.into(),
            position,
        }
    }
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Notifications a session delivers to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The client finished joining and is ready for interaction.
    Spawned,
    /// The connection terminated.
    Ended {
        /// Reason reported by the client.
        reason: String,
    },
    /// The remote side forcibly disconnected the client.
    Kicked {
        /// Kick reason as rendered text.
        reason: String,
        /// Whether the client had finished logging in when kicked.
        logged_in: bool,
    },
    /// A chat line was received.
    Chat(ChatLine),
}

impl SessionEvent {
    /// Returns the chat line carried by this event, if any.
    pub fn as_chat(&self) -> Option<&ChatLine> {
        match self {
            Self::Chat(line) => Some(line),
            _ => None,
        }
    }

    /// Returns the event name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawned => "spawned",
            Self::Ended { .. } => "ended",
            Self::Kicked { .. } => "kicked",
            Self::Chat(_) => "chat",
        }
    }
}

// =============================================================================
// Window State
// =============================================================================

/// A point-in-time view of the menu window the client has open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Window title as rendered text.
    pub title: String,
    /// Number of container slots holding an item.
    pub populated_slots: usize,
}

impl WindowSnapshot {
    /// Returns true if at least one slot holds an item.
    pub fn is_populated(&self) -> bool {
        self.populated_slots > 0
    }
}

// =============================================================================
// Connection Options
// =============================================================================

/// Authentication mode passed through to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Microsoft account login.
    #[default]
    Microsoft,
    /// Offline mode, no authentication.
    Offline,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Microsoft => f.write_str("microsoft"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// Parameters for opening a session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub identity: String,
    pub secret: String,
    pub endpoint: String,
    pub auth: AuthMode,
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth)
            .finish()
    }
}

/// A freshly opened session together with the stream its lifecycle events
/// arrive on.
///
/// `events` is subscribed before the connector returns, so no notification
/// emitted during the handshake is lost.
pub struct OpenedSession {
    pub session: BoxedSession,
    pub events: EventStream,
}

// =============================================================================
// Capability Traits
// =============================================================================

/// The capabilities Rivet uses from a live session.
///
/// Only [`chat`](Session::chat), [`subscribe`](Session::subscribe),
/// [`current_window`](Session::current_window) and
/// [`close`](Session::close) must be provided. Direct messages and commands
/// are sent as chat lines by default.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Returns the account name the session logged in as.
    fn username(&self) -> &str;

    /// Sends a raw chat line.
    async fn chat(&self, text: &str) -> SessionResult<()>;

    /// Sends a private message to `recipient`.
    async fn send_direct_message(&self, recipient: &str, text: &str) -> SessionResult<()> {
        self.chat(&format!("/m {recipient} {text}")).await
    }

    /// Sends a server command such as `/tpaccept`.
    async fn send_command(&self, text: &str) -> SessionResult<()> {
        self.chat(text).await
    }

    /// Subscribes to this session's notifications.
    fn subscribe(&self) -> EventStream;

    /// Returns the window the client currently has open.
    fn current_window(&self) -> Option<WindowSnapshot>;

    /// Requests a graceful disconnect.
    fn close(&self);

    /// Returns the session as `Any` for downcasting to a concrete adapter.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Opens sessions on behalf of a supervisor.
#[async_trait]
pub trait SessionConnector: Send + Sync + 'static {
    /// Opens a new session with the given options.
    async fn open(&self, options: SessionOptions) -> SessionResult<OpenedSession>;
}
