//! The loopback session.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rivet_core::{
    ChatLine, EVENT_CHANNEL_CAPACITY, EventStream, Session, SessionError, SessionEvent,
    SessionResult, WindowSnapshot,
};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Reason reported when the client side closes the session.
pub const CLIENT_CLOSE_REASON: &str = "disconnect.quitting";

/// An in-memory session.
///
/// Outbound chat is recorded instead of sent. Inbound notifications are
/// scripted by calling [`spawn`](Self::spawn), [`inject_chat`](Self::inject_chat),
/// [`kick`](Self::kick) and friends.
pub struct LoopbackSession {
    username: String,
    events: broadcast::Sender<SessionEvent>,
    outbound: Mutex<Vec<String>>,
    outbound_tx: broadcast::Sender<String>,
    window: Mutex<Option<WindowSnapshot>>,
    closed: AtomicBool,
}

impl LoopbackSession {
    pub(crate) fn new(username: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            username: username.into(),
            events,
            outbound: Mutex::new(Vec::new()),
            outbound_tx,
            window: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Delivers `event` to every subscriber. Returns the number reached.
    pub fn emit(&self, event: SessionEvent) -> usize {
        trace!(username = %self.username, kind = event.kind(), "Loopback event");
        self.events.send(event).unwrap_or(0)
    }

    pub fn spawn(&self) -> usize {
        self.emit(SessionEvent::Spawned)
    }

    pub fn inject_chat(&self, text: impl Into<String>) -> usize {
        self.emit(SessionEvent::Chat(ChatLine::new(text)))
    }

    /// Simulates the remote side ending the connection.
    pub fn end(&self, reason: impl Into<String>) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        self.emit(SessionEvent::Ended {
            reason: reason.into(),
        })
    }

    /// Simulates a kick. Like the real client, a kick is followed by `Ended`.
    pub fn kick(&self, reason: impl Into<String>, logged_in: bool) -> usize {
        let reason = reason.into();
        self.closed.store(true, Ordering::SeqCst);
        let reached = self.emit(SessionEvent::Kicked {
            reason: reason.clone(),
            logged_in,
        });
        self.emit(SessionEvent::Ended { reason });
        reached
    }

    pub fn set_window(&self, window: Option<WindowSnapshot>) {
        *self.window.lock() = window;
    }

    /// Every chat line sent through this session, oldest first.
    pub fn outbound(&self) -> Vec<String> {
        self.outbound.lock().clone()
    }

    /// Subscribes to outbound chat as it is sent.
    pub fn watch_outbound(&self) -> broadcast::Receiver<String> {
        self.outbound_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for LoopbackSession {
    fn username(&self) -> &str {
        &self.username
    }

    async fn chat(&self, text: &str) -> SessionResult<()> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        debug!(username = %self.username, text, "Outbound chat");
        self.outbound.lock().push(text.to_string());
        let _ = self.outbound_tx.send(text.to_string());
        Ok(())
    }

    fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    fn current_window(&self) -> Option<WindowSnapshot> {
        self.window.lock().clone()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.emit(SessionEvent::Ended {
            reason: CLIENT_CLOSE_REASON.to_string(),
        });
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_recorded() {
        let session = LoopbackSession::new("scout");
        let mut watch = session.watch_outbound();

        session.send_direct_message("alice", "hi").await.unwrap();
        session.send_command("/tpaccept").await.unwrap();

        assert_eq!(session.outbound(), vec!["/m alice hi", "/tpaccept"]);
        assert_eq!(watch.recv().await.unwrap(), "/m alice hi");
    }

    #[tokio::test]
    async fn test_close_emits_ended_once() {
        let session = LoopbackSession::new("scout");
        let mut events = session.subscribe();

        session.close();
        session.close();

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Ended {
                reason: CLIENT_CLOSE_REASON.into()
            }
        );
        assert!(events.try_recv().is_err());
        assert!(matches!(
            session.chat("anyone?").await,
            Err(SessionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_kick_followed_by_end() {
        let session = LoopbackSession::new("scout");
        let mut events = session.subscribe();
        session.kick("You are already connected", true);

        assert!(matches!(events.recv().await.unwrap(), SessionEvent::Kicked { logged_in: true, .. }));
        assert!(matches!(events.recv().await.unwrap(), SessionEvent::Ended { .. }));
    }

    #[test]
    fn test_window_snapshot() {
        let session = LoopbackSession::new("scout");
        assert!(session.current_window().is_none());
        session.set_window(Some(WindowSnapshot {
            title: "Shop".into(),
            populated_slots: 3,
        }));
        assert_eq!(session.current_window().map(|w| w.populated_slots), Some(3));
    }
}
