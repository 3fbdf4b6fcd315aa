use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use rivet_core::{BoxedSession, ChatLine, EventStream, SessionEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ModuleResult;
use crate::host::SharedHost;

/// A shared, type-erased module instance.
pub type BoxedModule = Arc<dyn Module>;

// ─── Module ───────────────────────────────────────────────────────────────────

/// A named capability installed on a supervisor.
///
/// One instance exists per tag per supervisor, and it outlives individual
/// sessions. [`setup`](Module::setup) runs every time a session goes live,
/// including after each reconnect, so anything it spawns must stop on the
/// context's cancellation token.
pub trait Module: Send + Sync + 'static {
    /// Unique tag, equal to the descriptor's.
    fn tag(&self) -> &'static str;

    /// Attaches the module to a freshly live session. May be a no-op.
    fn setup(&self, ctx: &SetupContext) -> ModuleResult;

    /// Returns the module as `Any` for typed lookups.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

// ─── SetupContext ─────────────────────────────────────────────────────────────

/// What a module gets when a session goes live.
#[derive(Clone)]
pub struct SetupContext {
    host: SharedHost,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl SetupContext {
    /// `events` is the channel the supervisor relays the live session's
    /// notifications on; `cancel` fires when that session ends.
    pub fn new(
        host: SharedHost,
        events: broadcast::Sender<SessionEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            host,
            events,
            cancel,
        }
    }

    pub fn host(&self) -> &SharedHost {
        &self.host
    }

    /// The session that just went live.
    ///
    /// Only use this during setup. Listeners should go through
    /// [`host`](Self::host) because a reconnect replaces the session.
    pub fn session(&self) -> Option<BoxedSession> {
        self.host.session()
    }

    /// Subscribes to the live session's notifications.
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Token cancelled when the live session ends.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Spawns a listener that calls `handler` for every chat line until the
    /// session ends.
    ///
    /// Lines are handled one at a time in arrival order. Handlers that may
    /// suspend for long should spawn their own task.
    pub fn on_chat<F, Fut>(&self, module: &'static str, handler: F)
    where
        F: Fn(SharedHost, ChatLine) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut events = self.subscribe();
        let cancel = self.cancel.clone();
        let host = self.host.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(SessionEvent::Chat(line)) => handler(host.clone(), line).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(module, skipped, "Chat listener lagged, lines dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(module, "Chat listener stopped");
        });
    }
}
