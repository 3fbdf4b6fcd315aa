//! # Rivet Core
//!
//! The session boundary of the Rivet supervisor.
//!
//! This crate defines what Rivet needs from an external game client and the
//! primitives used to wait on it. It knows nothing about modules, commands or
//! reconnect policy; those live in `rivet-framework` and `rivet-runtime`.
//!
//! ## Contents
//!
//! - **Session capability**: [`Session`], [`SessionConnector`] and the
//!   notifications they deliver ([`SessionEvent`], [`ChatLine`],
//!   [`WindowSnapshot`])
//! - **Wait primitives**: [`wait`](wait::wait), [`poll_until`],
//!   [`await_event`] and [`with_deadline`]
//! - **Errors**: [`SessionError`], [`WaitError`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use rivet_core::{await_event, SessionEvent};
//!
//! async fn wait_for_reply(session: rivet_core::BoxedSession) -> Option<String> {
//!     // Subscribe before sending so the reply cannot slip past.
//!     let events = session.subscribe();
//!     session.send_command("/money").await.ok()?;
//!     let event = await_event(
//!         events,
//!         |event| matches!(event, SessionEvent::Chat(line) if line.text.contains("balance")),
//!         Some(Duration::from_secs(5)),
//!     )
//!     .await
//!     .ok()?;
//!     event.as_chat().map(|line| line.text.clone())
//! }
//! ```

pub mod error;
pub mod session;
pub mod wait;

pub use error::{SessionError, SessionResult, WaitError, WaitResult};
pub use session::{
    AuthMode, BoxedSession, ChatLine, ChatPosition, EVENT_CHANNEL_CAPACITY, EventStream,
    OpenedSession, Session, SessionConnector, SessionEvent, SessionOptions, WindowSnapshot,
};
pub use wait::{await_event, await_event_map, poll_until, with_deadline};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::*;
    pub use super::session::*;
    pub use super::wait::{await_event, await_event_map, poll_until, wait, with_deadline};
}
