//! End-to-end supervisor behavior against the loopback session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rivet_adapter_loopback::{LoopbackConnector, LoopbackSession};
use rivet_core::{AuthMode, SessionEvent, WaitError, WindowSnapshot};
use rivet_framework::{CommandContext, CommandError, Host};
use rivet_runtime::{
    SessionState, Supervisor, SupervisorConfig, SupervisorRegistry, WINDOW_POLL_INTERVAL,
};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_test::{assert_pending, assert_ready, task};

const STEP: Duration = Duration::from_secs(1);

fn config() -> SupervisorConfig {
    SupervisorConfig::new("scout", "pw").with_allow_list(["alice"])
}

fn setup(connector: &LoopbackConnector) -> SupervisorRegistry {
    SupervisorRegistry::new(Arc::new(connector.clone()))
}

async fn wait_for_state(supervisor: &Supervisor, state: SessionState) {
    let mut states = supervisor.subscribe_state();
    timeout(STEP, states.wait_for(|current| *current == state))
        .await
        .unwrap_or_else(|_| panic!("supervisor never reached {state}"))
        .unwrap();
}

async fn live(
    registry: &SupervisorRegistry,
    connector: &LoopbackConnector,
    config: SupervisorConfig,
) -> (Arc<Supervisor>, Arc<LoopbackSession>) {
    let supervisor = registry.get_or_create(config);
    supervisor.login().await.unwrap();
    wait_for_state(&supervisor, SessionState::Live).await;
    (supervisor, connector.latest().unwrap())
}

async fn next_outbound(outbound: &mut broadcast::Receiver<String>) -> String {
    timeout(STEP, outbound.recv()).await.unwrap().unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_login_reaches_live_once_per_spawn() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let supervisor = registry.get_or_create(config());
    assert_eq!(supervisor.state(), SessionState::Absent);
    assert!(supervisor.session().is_none());

    supervisor.login().await.unwrap();
    wait_for_state(&supervisor, SessionState::Live).await;

    let options = connector.opened();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].identity, "scout");
    assert_eq!(options[0].endpoint, "jp.mcfallout.net");
    assert_eq!(options[0].auth, AuthMode::Microsoft);

    // A second spawn on the same session is not a new transition.
    let session = connector.latest().unwrap();
    session.spawn();
    session.end("server closed");
    wait_for_state(&supervisor, SessionState::Ended).await;

    let stats = supervisor.stats();
    assert_eq!(stats.logins, 1);
    assert_eq!(stats.spawns, 1);
    assert_eq!(stats.ends, 1);
    assert!(supervisor.session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_connecting_until_spawn() {
    let connector = LoopbackConnector::manual();
    let registry = setup(&connector);
    let supervisor = registry.get_or_create(config());

    supervisor.login().await.unwrap();
    assert_eq!(supervisor.state(), SessionState::Connecting);

    connector.latest().unwrap().spawn();
    wait_for_state(&supervisor, SessionState::Live).await;
}

#[tokio::test(start_paused = true)]
async fn test_login_replaces_existing_session() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, first) = live(&registry, &connector, config()).await;

    supervisor.login().await.unwrap();
    wait_for_state(&supervisor, SessionState::Live).await;

    assert!(first.is_closed());
    assert_eq!(connector.open_count(), 2);
    // The first session's end notification belongs to a replaced session.
    tokio::time::sleep(STEP).await;
    assert_eq!(supervisor.state(), SessionState::Live);
    assert_eq!(supervisor.stats().ends, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_command_gets_one_reply() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (_supervisor, session) = live(&registry, &connector, config()).await;
    let mut outbound = session.watch_outbound();

    session.inject_chat("[alice -> 您] /nothing here");

    assert_eq!(
        next_outbound(&mut outbound).await,
        "/m alice Unknown command. Use /help to list available commands."
    );
    tokio::time::sleep(STEP).await;
    assert_eq!(session.outbound().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_allowed_sender_dispatches_with_args() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let supervisor = registry.get_or_create(config());

    let calls: Arc<Mutex<Vec<(String, Vec<String>)>>> = Arc::default();
    let recorded = calls.clone();
    supervisor.commands().unwrap().register("warp", move |ctx: CommandContext| {
        let recorded = recorded.clone();
        async move {
            recorded.lock().push((ctx.sender.clone(), ctx.args.clone()));
            ctx.reply("warping").await
        }
    });

    supervisor.login().await.unwrap();
    wait_for_state(&supervisor, SessionState::Live).await;
    let session = connector.latest().unwrap();
    let mut outbound = session.watch_outbound();

    session.inject_chat("[bob -> 您] /warp home");
    session.inject_chat("[alice -> 您] /warp home");

    assert_eq!(next_outbound(&mut outbound).await, "/m alice warping");
    assert_eq!(
        *calls.lock(),
        vec![("alice".to_string(), vec!["home".to_string()])]
    );
}

#[tokio::test(start_paused = true)]
async fn test_handler_failure_reported_and_registry_usable() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let supervisor = registry.get_or_create(config());
    supervisor
        .commands()
        .unwrap()
        .register("fail", |_ctx: CommandContext| async move {
            Err(CommandError::user("No such warp: M"))
        });

    supervisor.login().await.unwrap();
    wait_for_state(&supervisor, SessionState::Live).await;
    let session = connector.latest().unwrap();
    let mut outbound = session.watch_outbound();

    session.inject_chat("[alice -> 您] /fail");
    assert_eq!(next_outbound(&mut outbound).await, "/m alice No such warp: M");

    session.inject_chat("[alice -> 您] /help");
    assert_eq!(next_outbound(&mut outbound).await, "/m alice help, tpMe, fail");
}

#[tokio::test(start_paused = true)]
async fn test_teleport_commands() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (_supervisor, session) = live(&registry, &connector, config()).await;
    let mut outbound = session.watch_outbound();

    session.inject_chat("[alice -> 您] /tpMe");
    assert_eq!(next_outbound(&mut outbound).await, "/tpa alice");

    session.inject_chat("[系統] bob 想要你傳送到 該玩家 的位置");
    session.inject_chat("[系統] alice 想要傳送到 你 的位置");
    assert_eq!(next_outbound(&mut outbound).await, "/tpaccept");
    assert_eq!(session.outbound(), vec!["/tpa alice", "/tpaccept"]);
}

#[tokio::test(start_paused = true)]
async fn test_tell_truncates_and_enforces_allow_list() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, session) = live(&registry, &connector, config()).await;

    let long = "z".repeat(300);
    supervisor.tell("alice", &long, true).await.unwrap();
    supervisor.tell("bob", "secret", true).await.unwrap();
    supervisor.tell("bob", "hello", false).await.unwrap();

    let sent = session.outbound();
    assert_eq!(sent.len(), 2);
    let body = sent[0].strip_prefix("/m alice ").unwrap();
    assert_eq!(body.chars().count(), 200);
    assert!(body.ends_with("..."));
    assert_eq!(sent[1], "/m bob hello");
}

#[tokio::test(start_paused = true)]
async fn test_tell_without_session_fails() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let supervisor = registry.get_or_create(config());
    assert!(supervisor.tell("alice", "hi", true).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_kick_already_connected_disables_reconnect() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, session) =
        live(&registry, &connector, config().with_auto_reconnect(true)).await;

    session.kick("You are already connected to this proxy!", true);
    wait_for_state(&supervisor, SessionState::Ended).await;
    assert!(!supervisor.config().auto_reconnect);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.open_count(), 1);
    assert_eq!(supervisor.stats().kicks, 1);
    assert_eq!(supervisor.stats().ends, 1);
}

#[tokio::test(start_paused = true)]
async fn test_other_kick_schedules_retry() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, session) =
        live(&registry, &connector, config().with_auto_reconnect(true)).await;

    session.kick("Server restarting", true);
    wait_for_state(&supervisor, SessionState::Ended).await;
    assert!(supervisor.config().auto_reconnect);

    tokio::time::sleep(Duration::from_millis(4900)).await;
    assert_eq!(connector.open_count(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    wait_for_state(&supervisor, SessionState::Live).await;
    assert_eq!(connector.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_login_retries_while_enabled() {
    let connector = LoopbackConnector::default();
    connector.fail_next_open("connection refused");
    let registry = setup(&connector);
    let supervisor = registry.get_or_create(config().with_auto_reconnect(true));

    assert!(supervisor.login().await.is_err());
    assert_eq!(supervisor.state(), SessionState::Ended);

    tokio::time::sleep(Duration::from_secs(6)).await;
    wait_for_state(&supervisor, SessionState::Live).await;
    assert_eq!(connector.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_end_cancels_pending_reconnect() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, session) =
        live(&registry, &connector, config().with_auto_reconnect(true)).await;

    session.end("server closed");
    wait_for_state(&supervisor, SessionState::Ended).await;
    supervisor.end();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.open_count(), 1);
    assert!(supervisor.config().auto_reconnect);
}

#[tokio::test(start_paused = true)]
async fn test_end_closes_live_session_without_reconnect() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, session) =
        live(&registry, &connector, config().with_auto_reconnect(true)).await;

    supervisor.end();
    assert_eq!(supervisor.state(), SessionState::Ended);
    assert!(session.is_closed());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remove_ends_session() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (_supervisor, session) = live(&registry, &connector, config()).await;

    assert!(registry.remove("scout").is_some());
    assert!(registry.is_empty());
    assert!(session.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_await_window_open() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, session) = live(&registry, &connector, config()).await;

    let opener = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        opener.set_window(Some(WindowSnapshot {
            title: "Shop".into(),
            populated_slots: 0,
        }));
    });

    let window = supervisor
        .await_window_open(false, Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(window.title, "Shop");

    // An empty window does not count when contents are required.
    assert!(
        supervisor
            .await_window_open(true, Some(Duration::from_millis(500)))
            .await
            .is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn test_await_window_open_rechecks_each_interval() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, session) = live(&registry, &connector, config()).await;

    let mut waiter = task::spawn(supervisor.await_window_open(true, None));
    assert_pending!(waiter.poll());

    session.set_window(Some(WindowSnapshot {
        title: "Chest".into(),
        populated_slots: 3,
    }));
    // Still pending until the next poll interval elapses.
    assert_pending!(waiter.poll());

    tokio::time::advance(WINDOW_POLL_INTERVAL + Duration::from_millis(1)).await;
    let window = assert_ready!(waiter.poll());
    assert_eq!(window.map(|w| w.title), Some("Chest".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_await_message() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, session) = live(&registry, &connector, config()).await;

    let waiter = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            supervisor
                .await_message(|line| line.text.contains("balance"), Some(STEP))
                .await
        })
    };
    tokio::task::yield_now().await;
    session.inject_chat("hello");
    session.inject_chat("Your balance is 42");

    let line = waiter.await.unwrap().unwrap();
    assert_eq!(line.text, "Your balance is 42");

    assert_eq!(
        supervisor
            .await_message(|_| true, Some(Duration::from_millis(100)))
            .await,
        Err(WaitError::Timeout)
    );
}

#[tokio::test(start_paused = true)]
async fn test_modules_see_chat_after_reconnect() {
    let connector = LoopbackConnector::default();
    let registry = setup(&connector);
    let (supervisor, first) =
        live(&registry, &connector, config().with_auto_reconnect(true)).await;

    first.emit(SessionEvent::Ended {
        reason: "timeout".into(),
    });
    tokio::time::sleep(Duration::from_secs(6)).await;
    wait_for_state(&supervisor, SessionState::Live).await;

    let second = connector.latest().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    let mut outbound = second.watch_outbound();
    second.inject_chat("[alice -> 您] /tpMe");
    assert_eq!(next_outbound(&mut outbound).await, "/tpa alice");
    // Listeners of the first session are gone, so only one reply.
    tokio::time::sleep(STEP).await;
    assert_eq!(second.outbound().len(), 1);
    assert_eq!(supervisor.identity(), Host::identity(supervisor.as_ref()));
}
