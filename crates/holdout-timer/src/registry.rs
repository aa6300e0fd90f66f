//! Per-key timer slots.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::debug;

use crate::{CountdownConfig, TimerHandle, TimerKind, spawn_countdown};

/// Holds at most one running timer per `(key, kind)`.
///
/// The key is normally a session id, so sessions never share timer state
/// and any number of them can count down concurrently. Starting a timer in
/// an occupied slot stops the previous occupant first.
///
/// The lock is only held to swap handles, never across an await.
pub struct TimerRegistry<K> {
    timers: Mutex<HashMap<(K, TimerKind), TimerHandle>>,
}

impl<K> TimerRegistry<K>
where
    K: Eq + Hash + Clone + Display,
{
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Start a countdown in the `(key, kind)` slot, superseding whatever was
    /// there. Returns the new timer's id.
    pub fn start<T, X>(
        &self,
        key: K,
        kind: TimerKind,
        config: CountdownConfig,
        on_tick: T,
        on_expire: X,
    ) -> u64
    where
        T: FnMut(u32) + Send + 'static,
        X: FnOnce() + Send + 'static,
    {
        let handle = spawn_countdown(kind, config, on_tick, on_expire);
        let id = handle.id();

        let mut timers = self.timers.lock();
        timers.retain(|_, h| !h.is_finished());
        if let Some(previous) = timers.insert((key.clone(), kind), handle) {
            previous.stop();
            debug!(
                %key,
                %kind,
                previous = previous.id(),
                replacement = id,
                "timer superseded"
            );
        }
        id
    }

    /// Stop the timer in the `(key, kind)` slot. Returns `true` if one was
    /// still running.
    pub fn stop(&self, key: &K, kind: TimerKind) -> bool {
        match self.timers.lock().remove(&(key.clone(), kind)) {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.stop();
                was_running
            }
            None => false,
        }
    }

    /// Stop every timer belonging to `key`. Returns how many were removed.
    pub fn stop_all(&self, key: &K) -> usize {
        let mut timers = self.timers.lock();
        let before = timers.len();
        timers.retain(|(k, _), handle| {
            if k == key {
                handle.stop();
                false
            } else {
                true
            }
        });
        before - timers.len()
    }

    /// Returns `true` if the `(key, kind)` slot holds a timer that has not
    /// exited yet.
    pub fn is_running(&self, key: &K, kind: TimerKind) -> bool {
        self.timers
            .lock()
            .get(&(key.clone(), kind))
            .is_some_and(|h| !h.is_finished())
    }

    /// Number of timers still running across all keys.
    pub fn running(&self) -> usize {
        self.timers
            .lock()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl<K> Default for TimerRegistry<K>
where
    K: Eq + Hash + Clone + Display,
{
    fn default() -> Self {
        Self::new()
    }
}
