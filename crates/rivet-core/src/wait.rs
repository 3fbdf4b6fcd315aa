//! Asynchronous wait primitives.
//!
//! Sessions report state changes through unordered notifications. These
//! helpers sequence multi-step interactions on top of them:
//!
//! | helper | resolves when |
//! |--------|---------------|
//! | [`wait`] | the duration has elapsed |
//! | [`poll_until`] | a predicate returns `true` |
//! | [`await_event`] | a notification matches |
//! | [`await_event_map`] | a notification maps to `Some` |
//!
//! Each helper is a single future. Dropping it releases its timer and its
//! subscription, so there is nothing to clean up on any exit path.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{WaitError, WaitResult};

/// Sleeps for at least `duration`.
pub async fn wait(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Runs `fut` to completion, failing with [`WaitError::Timeout`] if
/// `deadline` elapses first. `None` waits indefinitely.
pub async fn with_deadline<F>(deadline: Option<Duration>, fut: F) -> WaitResult<F::Output>
where
    F: Future,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| WaitError::Timeout),
        None => Ok(fut.await),
    }
}

/// Evaluates `predicate` immediately and then once per `interval` until it
/// returns `true`.
///
/// With a deadline, the last evaluation happens when the deadline is
/// reached; if it is still `false` the call fails with
/// [`WaitError::Timeout`].
pub async fn poll_until<P>(
    mut predicate: P,
    interval: Duration,
    deadline: Option<Duration>,
) -> WaitResult<()>
where
    P: FnMut() -> bool,
{
    let started = Instant::now();
    loop {
        if predicate() {
            return Ok(());
        }

        let pause = match deadline {
            Some(limit) => {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(WaitError::Timeout);
                }
                interval.min(limit - elapsed)
            }
            None => interval,
        };
        tokio::time::sleep(pause).await;
    }
}

/// Resolves with the first payload on `stream` accepted by `matcher`.
///
/// The receiver is consumed: once the call settles it is dropped, so later
/// payloads can never affect it. Receivers that fall behind skip the missed
/// payloads and keep matching.
pub async fn await_event<T, M>(
    stream: broadcast::Receiver<T>,
    mut matcher: M,
    deadline: Option<Duration>,
) -> WaitResult<T>
where
    T: Clone,
    M: FnMut(&T) -> bool,
{
    await_event_map(
        stream,
        |item| matcher(item).then(|| item.clone()),
        deadline,
    )
    .await
}

/// Like [`await_event`], but `extract` both matches and projects the
/// payload.
pub async fn await_event_map<T, U, F>(
    mut stream: broadcast::Receiver<T>,
    mut extract: F,
    deadline: Option<Duration>,
) -> WaitResult<U>
where
    T: Clone,
    F: FnMut(&T) -> Option<U>,
{
    with_deadline(deadline, async move {
        loop {
            match stream.recv().await {
                Ok(item) => {
                    if let Some(found) = extract(&item) {
                        return Ok(found);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event waiter lagged behind");
                }
                Err(RecvError::Closed) => return Err(WaitError::Closed),
            }
        }
    })
    .await?
}
