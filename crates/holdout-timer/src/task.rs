//! Countdown task with tick/expire callbacks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::{Countdown, CountdownConfig, TimerKind};

/// Counter for generating unique timer IDs (for logs).
static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a running countdown task.
///
/// Dropping the handle cancels the countdown the same way [`stop`](Self::stop)
/// does.
#[derive(Debug)]
pub struct TimerHandle {
    id: u64,
    kind: TimerKind,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    /// Cancel the countdown. `on_expire` will not be called unless it is
    /// already running. Idempotent.
    pub fn stop(&self) {
        if !self.cancel.send_replace(true) {
            debug!(timer_id = self.id, kind = %self.kind, "timer stopped");
        }
    }

    /// Returns `true` once the task has exited, whether it expired or was
    /// stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Start a countdown on its own task.
///
/// `on_tick(remaining)` runs after every decrement, including the final 0.
/// `on_expire()` then runs exactly once unless the handle was stopped first.
/// A panic in either callback is caught and logged; it never takes down the
/// runtime or other timers.
pub fn spawn_countdown<T, X>(
    kind: TimerKind,
    config: CountdownConfig,
    mut on_tick: T,
    on_expire: X,
) -> TimerHandle
where
    T: FnMut(u32) + Send + 'static,
    X: FnOnce() + Send + 'static,
{
    let id = NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed);
    let (cancel, mut cancelled) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut countdown = Countdown::new(config);
        debug!(timer_id = id, %kind, seconds = countdown.remaining(), "timer started");

        while !countdown.is_expired() {
            tokio::select! {
                biased;
                // Err means the handle was dropped.
                res = cancelled.changed() => {
                    if res.is_err() || *cancelled.borrow() {
                        return;
                    }
                }
                tick = countdown.wait_for_tick() => {
                    let remaining = tick.remaining;
                    if catch_unwind(AssertUnwindSafe(|| on_tick(remaining))).is_err() {
                        error!(timer_id = id, %kind, remaining, "timer tick callback panicked");
                    }
                }
            }
        }

        if *cancelled.borrow() {
            return;
        }

        debug!(timer_id = id, %kind, "timer expired");
        if catch_unwind(AssertUnwindSafe(on_expire)).is_err() {
            error!(timer_id = id, %kind, "timer expire callback panicked");
        }
    });

    TimerHandle {
        id,
        kind,
        cancel,
        task,
    }
}
