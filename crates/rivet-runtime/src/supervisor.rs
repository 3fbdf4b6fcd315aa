//! The session supervisor.
//!
//! A [`Supervisor`] owns at most one session for one identity and drives it
//! through a small state machine:
//!
//! ```text
//! Absent ──login()──▶ Connecting ──Spawned──▶ Live
//!    ▲                    │                     │
//!    │                    └──open failed──┐     │ Ended / Kicked
//!    │                                    ▼     ▼
//!    └──────────────────────────────────  Ended ──(auto_reconnect)──▶ login()
//! ```
//!
//! Each session gets its own event loop task, cancellation token and
//! generation number. Notifications from a session that has since been
//! replaced are ignored.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rivet_core::{
    BoxedSession, ChatLine, EVENT_CHANNEL_CAPACITY, EventStream, OpenedSession, SessionConnector,
    SessionError, SessionEvent, SessionResult, WaitError, WaitResult, WindowSnapshot,
    await_event_map, poll_until,
};
use rivet_framework::{
    CommandRegistry, CommanderModule, Host, Module, ModuleDescriptor, ModuleRegistry,
    SetupContext, SharedHost,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::SupervisorConfig;
use crate::error::RuntimeResult;

/// Longest private message sent in one piece, in characters.
pub const MAX_MESSAGE_CHARS: usize = 200;

const TRUNCATION_MARKER: &str = "...";

/// How often [`Supervisor::await_window_open`] looks at the window.
pub const WINDOW_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Kick reasons meaning the account logged in somewhere else. Reconnecting
/// would only kick the other login.
const DUPLICATE_LOGIN_MARKERS: &[&str] = &["already connected", "已經連線", "已在其他地方登入"];

/// Lifecycle state of a supervisor's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session has been opened yet.
    #[default]
    Absent,
    /// A session is being opened or has not spawned yet.
    Connecting,
    /// The session spawned and modules are set up.
    Live,
    /// The last session ended, was kicked or failed to open.
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Live => write!(f, "Live"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

/// Lifetime counters for one supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Calls to `login`, including automatic reconnects.
    pub logins: u64,
    /// Sessions that reached `Live`.
    pub spawns: u64,
    /// Transitions to `Ended`.
    pub ends: u64,
    /// Kicks received.
    pub kicks: u64,
}

#[derive(Default)]
struct Counters {
    logins: AtomicU64,
    spawns: AtomicU64,
    ends: AtomicU64,
    kicks: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SupervisorStats {
        SupervisorStats {
            logins: self.logins.load(Ordering::Relaxed),
            spawns: self.spawns.load(Ordering::Relaxed),
            ends: self.ends.load(Ordering::Relaxed),
            kicks: self.kicks.load(Ordering::Relaxed),
        }
    }
}

struct ActiveSession {
    handle: BoxedSession,
    token: CancellationToken,
}

struct SupervisorInner {
    config: SupervisorConfig,
    session: Option<ActiveSession>,
    /// Bumped by every `login` and `end`. Work tagged with an older value
    /// belongs to a replaced session.
    generation: u64,
    reconnect: Option<CancellationToken>,
}

/// Owns the session for one identity.
pub struct Supervisor {
    me: Weak<Supervisor>,
    identity: String,
    connector: Arc<dyn SessionConnector>,
    modules: ModuleRegistry,
    inner: Mutex<SupervisorInner>,
    state: watch::Sender<SessionState>,
    counters: Counters,
}

impl Supervisor {
    /// Creates a supervisor with `descriptors` installed, in order. No
    /// session is opened.
    pub fn new<I>(
        config: SupervisorConfig,
        connector: Arc<dyn SessionConnector>,
        descriptors: I,
    ) -> Arc<Self>
    where
        I: IntoIterator<Item = &'static ModuleDescriptor>,
    {
        let mut modules = ModuleRegistry::new();
        for descriptor in descriptors {
            // Duplicates are logged by the registry.
            let _ = modules.install(descriptor);
        }
        debug!(identity = %config.identity, modules = ?modules.tags(), "Supervisor created");

        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            identity: config.identity.clone(),
            connector,
            modules,
            inner: Mutex::new(SupervisorInner {
                config,
                session: None,
                generation: 0,
                reconnect: None,
            }),
            state: watch::Sender::new(SessionState::Absent),
            counters: Counters::default(),
        })
    }

    // ===== Accessors =====

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watches state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> SupervisorConfig {
        self.inner.lock().config.clone()
    }

    /// Replaces the configuration. The running session, if any, is kept.
    pub fn set_config(&self, config: SupervisorConfig) {
        if config.identity != self.identity {
            warn!(
                identity = %self.identity,
                new_identity = %config.identity,
                "Ignoring identity change in replacement config"
            );
        }
        let mut inner = self.inner.lock();
        let identity = std::mem::take(&mut inner.config.identity);
        inner.config = SupervisorConfig { identity, ..config };
    }

    pub fn session(&self) -> Option<BoxedSession> {
        self.inner
            .lock()
            .session
            .as_ref()
            .map(|active| active.handle.clone())
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// The first installed module of type `T`.
    pub fn module<T: Module>(&self) -> Option<Arc<T>> {
        self.modules.find::<T>()
    }

    /// The command registry of the `commander` module.
    pub fn commands(&self) -> Option<Arc<CommandRegistry>> {
        self.module::<CommanderModule>()
            .map(|commander| commander.commands().clone())
    }

    pub fn stats(&self) -> SupervisorStats {
        self.counters.snapshot()
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(identity = %self.identity, from = %previous, to = %next, "State changed");
        }
    }

    // ===== Lifecycle =====

    /// Opens a new session, ending the current one first.
    ///
    /// Returns once the connector has opened the session. Going live happens
    /// later, when the session reports that it spawned. A connector failure
    /// moves the supervisor to `Ended` and, with `auto_reconnect`, schedules
    /// another attempt.
    pub async fn login(&self) -> RuntimeResult<()> {
        let (generation, options, previous) = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            if let Some(pending) = inner.reconnect.take() {
                pending.cancel();
            }
            (
                inner.generation,
                inner.config.session_options(),
                inner.session.take(),
            )
        };

        if let Some(previous) = previous {
            info!(identity = %self.identity, "Ending current session before login");
            previous.token.cancel();
            previous.handle.close();
        }

        Counters::bump(&self.counters.logins);
        self.set_state(SessionState::Connecting);
        info!(identity = %self.identity, endpoint = %options.endpoint, auth = %options.auth, "Logging in");

        let OpenedSession { session, events } = match self.connector.open(options).await {
            Ok(opened) => opened,
            Err(err) => {
                error!(identity = %self.identity, error = %err, "Login failed");
                self.on_ended(generation, &err.to_string());
                return Err(err.into());
            }
        };

        let token = CancellationToken::new();
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                drop(inner);
                debug!(identity = %self.identity, "Login superseded while connecting");
                session.close();
                return Ok(());
            }
            inner.session = Some(ActiveSession {
                handle: session.clone(),
                token: token.clone(),
            });
        }

        let Some(this) = self.me.upgrade() else {
            session.close();
            return Err(SessionError::Closed.into());
        };
        let span = info_span!("session", identity = %self.identity, generation);
        tokio::spawn(this.run_session(generation, events, token).instrument(span));
        Ok(())
    }

    /// Ends the current session and cancels any pending reconnect.
    ///
    /// `auto_reconnect` is left as configured, so a later `login` behaves as
    /// before.
    pub fn end(&self) {
        let (active, pending) = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            (inner.session.take(), inner.reconnect.take())
        };

        if let Some(pending) = pending {
            debug!(identity = %self.identity, "Pending reconnect cancelled");
            pending.cancel();
        }
        if let Some(active) = active {
            info!(identity = %self.identity, "Ending session");
            active.token.cancel();
            active.handle.close();
        }
        if self.state() != SessionState::Absent {
            self.set_state(SessionState::Ended);
        }
    }

    async fn run_session(
        self: Arc<Self>,
        generation: u64,
        mut events: EventStream,
        token: CancellationToken,
    ) {
        let (relay, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut spawned = false;

        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Session loop cancelled");
                    return;
                }
                event = events.recv() => event,
            };

            match event {
                Ok(SessionEvent::Spawned) if spawned => debug!("Ignoring repeated spawn"),
                Ok(SessionEvent::Spawned) => {
                    spawned = true;
                    self.on_spawned(generation, &relay, &token);
                }
                Ok(SessionEvent::Chat(line)) => {
                    debug!(position = ?line.position, text = %line.text, "Chat");
                    // No receivers before the first setup; nothing to relay to.
                    let _ = relay.send(SessionEvent::Chat(line));
                }
                Ok(SessionEvent::Ended { reason }) => {
                    self.on_ended(generation, &reason);
                    break;
                }
                Ok(SessionEvent::Kicked { reason, logged_in }) => {
                    self.on_kicked(generation, &reason, logged_in);
                    self.on_ended(generation, &reason);
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session loop lagged, notifications dropped");
                }
                Err(RecvError::Closed) => {
                    self.on_ended(generation, "event stream closed");
                    break;
                }
            }
        }
        debug!("Session loop finished");
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    fn on_spawned(
        self: &Arc<Self>,
        generation: u64,
        relay: &broadcast::Sender<SessionEvent>,
        token: &CancellationToken,
    ) {
        if !self.is_current(generation) {
            debug!("Ignoring spawn from replaced session");
            return;
        }
        Counters::bump(&self.counters.spawns);
        self.set_state(SessionState::Live);
        info!(identity = %self.identity, "Session live");

        let host: SharedHost = self.clone();
        let ctx = SetupContext::new(host, relay.clone(), token.child_token());
        let failures = self.modules.setup_all(&ctx);
        if failures > 0 {
            warn!(identity = %self.identity, failures, "Some modules failed to set up");
        }
    }

    fn on_kicked(&self, generation: u64, reason: &str, logged_in: bool) {
        Counters::bump(&self.counters.kicks);
        if !is_duplicate_login(reason) {
            warn!(identity = %self.identity, reason, logged_in, "Kicked");
            return;
        }
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        inner.config.auto_reconnect = false;
        drop(inner);
        error!(
            identity = %self.identity,
            reason,
            logged_in,
            "Kicked because the account is connected elsewhere, auto reconnect disabled"
        );
    }

    fn on_ended(&self, generation: u64, reason: &str) {
        let reconnect = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!(identity = %self.identity, reason, "Ignoring end of replaced session");
                return;
            }
            if let Some(active) = inner.session.take() {
                active.token.cancel();
            }
            inner.config.auto_reconnect.then(|| {
                let token = CancellationToken::new();
                inner.reconnect = Some(token.clone());
                (inner.config.reconnect_delay(), token)
            })
        };

        Counters::bump(&self.counters.ends);
        self.set_state(SessionState::Ended);
        info!(identity = %self.identity, reason, "Session ended");

        if let Some((delay, token)) = reconnect {
            self.schedule_reconnect(delay, token);
        }
    }

    fn schedule_reconnect(&self, delay: Duration, token: CancellationToken) {
        info!(
            identity = %self.identity,
            delay_ms = delay.as_millis() as u64,
            "Reconnect scheduled"
        );
        let me = self.me.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let Some(this) = me.upgrade() else {
                return;
            };
            if let Err(err) = this.login().await {
                warn!(identity = %this.identity, error = %err, "Reconnect attempt failed");
            }
        });
    }

    // ===== Interaction =====

    /// Sends a server command through the current session.
    pub async fn send_command(&self, text: &str) -> SessionResult<()> {
        let session = self.session().ok_or(SessionError::NotConnected)?;
        session.send_command(text).await
    }

    /// Waits until the session has a window open.
    ///
    /// With `require_non_empty`, a window only counts once one of its slots
    /// holds an item. Returns `None` when the deadline passes or the session
    /// goes away first.
    pub async fn await_window_open(
        &self,
        require_non_empty: bool,
        deadline: Option<Duration>,
    ) -> Option<WindowSnapshot> {
        let mut found = None;
        let outcome = poll_until(
            || match self.session() {
                None => true,
                Some(session) => match session.current_window() {
                    Some(window) if !require_non_empty || window.is_populated() => {
                        found = Some(window);
                        true
                    }
                    _ => false,
                },
            },
            WINDOW_POLL_INTERVAL,
            deadline,
        )
        .await;

        if outcome.is_err() {
            debug!(identity = %self.identity, "Timed out waiting for a window");
        }
        found
    }

    /// Waits for the next chat line accepted by `matcher`.
    ///
    /// Fails with [`WaitError::Closed`] if there is no session.
    pub async fn await_message<M>(
        &self,
        mut matcher: M,
        deadline: Option<Duration>,
    ) -> WaitResult<ChatLine>
    where
        M: FnMut(&ChatLine) -> bool,
    {
        let session = self.session().ok_or(WaitError::Closed)?;
        await_event_map(
            session.subscribe(),
            |event| event.as_chat().filter(|line| matcher(line)).cloned(),
            deadline,
        )
        .await
    }
}

#[async_trait]
impl Host for Supervisor {
    fn identity(&self) -> String {
        self.identity.clone()
    }

    fn session(&self) -> Option<BoxedSession> {
        Supervisor::session(self)
    }

    fn check_allow_list(&self, user: &str) -> bool {
        self.inner.lock().config.is_allowed(user)
    }

    async fn tell(&self, user: &str, text: &str, enforce_allow_list: bool) -> SessionResult<()> {
        if enforce_allow_list && !self.check_allow_list(user) {
            debug!(identity = %self.identity, user, "Not telling player outside allow-list");
            return Ok(());
        }
        let session = self.session().ok_or(SessionError::NotConnected)?;
        session
            .send_direct_message(user, &truncate_message(text))
            .await
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(pending) = inner.reconnect.take() {
            pending.cancel();
        }
        if let Some(active) = inner.session.take() {
            active.token.cancel();
            active.handle.close();
        }
    }
}

/// Shortens `text` to [`MAX_MESSAGE_CHARS`] characters, ending with `...`
/// when anything was cut.
pub fn truncate_message(text: &str) -> Cow<'_, str> {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return Cow::Borrowed(text);
    }
    let keep = MAX_MESSAGE_CHARS - TRUNCATION_MARKER.chars().count();
    let mut shortened: String = text.chars().take(keep).collect();
    shortened.push_str(TRUNCATION_MARKER);
    Cow::Owned(shortened)
}

fn is_duplicate_login(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    DUPLICATE_LOGIN_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}
