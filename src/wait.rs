//! Eventual-consistency polling.
//!
//! [`eventually`] runs an assertion block repeatedly until it passes or a
//! deadline expires. Intermediate attempts run against a [`ShadowSink`], so the
//! test only ever sees the annotations of the final attempt.
//!
//! ```rust,ignore
//! let mut ready = None;
//! eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
//!     let sts = t.require_ok(cluster.get_statefulset(&ns, &name).await, "get statefulset");
//!     t.require_true(is_ready(&sts), "statefulset not ready");
//!     ready = Some(sts);
//! })
//! .await;
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::debug;

use crate::sink::{AttemptAborted, ShadowSink, Sink};

/// Poll `predicate` every `period` until it passes or `timeout` elapses.
///
/// - An attempt passes when it neither marks its sink failed nor unwinds.
/// - `fail_now`/`fatal` inside an attempt abort only that attempt. Any other
///   panic (e.g. `assert!`) is treated the same way.
/// - At the deadline the predicate runs once more against `t`, so the real
///   failure messages are recorded there; then this function returns.
///
/// Cancellation of anything the predicate captured is not observed here; only
/// the wall-clock deadline ends the wait.
pub async fn eventually<F>(t: &dyn Sink, timeout: Duration, period: Duration, mut predicate: F)
where
    F: AsyncFnMut(&dyn Sink),
{
    t.helper();

    let deadline = sleep(timeout);
    tokio::pin!(deadline);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if attempt_passes(t.name(), attempt, &mut predicate).await {
            debug!(test = %t.name(), attempt, "Condition met");
            return;
        }

        tokio::select! {
            biased;
            () = &mut deadline => break,
            _ = ticker.tick() => {}
        }
    }

    debug!(
        test = %t.name(),
        attempts = attempt,
        ?timeout,
        "Deadline reached, running final attempt against the test sink"
    );
    predicate(t).await;
}

async fn attempt_passes<F>(name: &str, attempt: u32, predicate: &mut F) -> bool
where
    F: AsyncFnMut(&dyn Sink),
{
    let shadow = ShadowSink::new(name, attempt);
    let sink: &dyn Sink = &shadow;
    match AssertUnwindSafe(predicate(sink)).catch_unwind().await {
        Ok(()) => !shadow.failed(),
        Err(payload) => {
            if !payload.is::<AttemptAborted>() {
                debug!(
                    test = %name,
                    attempt,
                    "Attempt panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
