//! The loopback connector.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rivet_core::{
    OpenedSession, Session, SessionConnector, SessionError, SessionOptions, SessionResult,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::LoopbackConfig;
use crate::session::LoopbackSession;

/// Open attempts remembered by [`LoopbackConnector::opened`].
pub const OPEN_HISTORY: usize = 32;

#[derive(Default)]
struct ConnectorState {
    sessions: Vec<Arc<LoopbackSession>>,
    opened: VecDeque<SessionOptions>,
    open_count: usize,
    failures: VecDeque<String>,
}

/// Opens [`LoopbackSession`]s and keeps the ones that are still open.
///
/// Closed sessions are dropped on the next `open`, so a reconnect loop
/// does not accumulate them.
///
/// Clones share state, so a test can hand one clone to the supervisor and
/// script sessions through another.
#[derive(Clone)]
pub struct LoopbackConnector {
    config: Arc<LoopbackConfig>,
    state: Arc<Mutex<ConnectorState>>,
    opened_tx: broadcast::Sender<Arc<LoopbackSession>>,
}

impl LoopbackConnector {
    pub fn new(config: LoopbackConfig) -> Self {
        let (opened_tx, _) = broadcast::channel(16);
        Self {
            config: Arc::new(config),
            state: Arc::default(),
            opened_tx,
        }
    }

    /// A connector whose sessions never spawn on their own.
    pub fn manual() -> Self {
        Self::new(LoopbackConfig {
            auto_spawn: false,
            ..Default::default()
        })
    }

    /// Makes the next `open` call fail with `reason`.
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        self.state.lock().failures.push_back(reason.into());
    }

    /// Number of open attempts, including failed ones.
    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    /// Options of the last [`OPEN_HISTORY`] open attempts, oldest first.
    pub fn opened(&self) -> Vec<SessionOptions> {
        self.state.lock().opened.iter().cloned().collect()
    }

    pub fn sessions(&self) -> Vec<Arc<LoopbackSession>> {
        self.state.lock().sessions.clone()
    }

    /// The most recently opened session.
    pub fn latest(&self) -> Option<Arc<LoopbackSession>> {
        self.state.lock().sessions.last().cloned()
    }

    /// Notifies about every session opened from now on.
    pub fn watch_opened(&self) -> broadcast::Receiver<Arc<LoopbackSession>> {
        self.opened_tx.subscribe()
    }
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self::new(LoopbackConfig::default())
    }
}

#[async_trait]
impl SessionConnector for LoopbackConnector {
    async fn open(&self, options: SessionOptions) -> SessionResult<OpenedSession> {
        let failure = {
            let mut state = self.state.lock();
            state.open_count += 1;
            if state.opened.len() == OPEN_HISTORY {
                state.opened.pop_front();
            }
            state.opened.push_back(options.clone());
            state.sessions.retain(|session| !session.is_closed());
            state.failures.pop_front()
        };
        if let Some(reason) = failure {
            warn!(identity = %options.identity, reason = %reason, "Loopback open failed");
            return Err(SessionError::connect_failed(options.endpoint, reason));
        }

        let session = Arc::new(LoopbackSession::new(options.identity.clone()));
        let events = session.subscribe();
        self.state.lock().sessions.push(session.clone());
        debug!(identity = %options.identity, endpoint = %options.endpoint, "Loopback session opened");

        if self.config.auto_spawn {
            session.spawn();
            for line in &self.config.greeting {
                session.inject_chat(line.clone());
            }
        }
        let _ = self.opened_tx.send(session.clone());

        Ok(OpenedSession { session, events })
    }
}
