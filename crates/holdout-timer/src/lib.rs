//! Countdown timers for Holdout.
//!
//! A session moves through timed windows: a round countdown, then a choice
//! countdown, then the next round. This crate provides the three pieces
//! that drive them:
//!
//! - [`Countdown`]: a fixed-cadence scheduler that yields once per period
//!   with the seconds remaining, down to and including zero.
//! - [`spawn_countdown`] runs a `Countdown` as its own Tokio task, calling
//!   `on_tick(remaining)` after every decrement and `on_expire()` exactly
//!   once at zero. The returned [`TimerHandle`] stops it cooperatively.
//! - [`TimerRegistry`] keeps one slot per `(key, TimerKind)`. Starting a timer
//!   in an occupied slot stops the previous one, so at most one round timer
//!   and one choice timer exist per session at any instant.
//!
//! # Cancellation
//!
//! Stopping is cooperative. A timer that has not reached zero never calls
//! `on_expire` after [`TimerHandle::stop`]. An expiry callback that is
//! already running is not interrupted.
//!
//! ```ignore
//! registry.start(session_id, TimerKind::Round, CountdownConfig::seconds(15),
//!     move |remaining| events.emit(tick_event(remaining)),
//!     move || { let _ = tx.send(SessionTimer::Expired); },
//! );
//! ```

mod countdown;
mod registry;
mod task;

pub use countdown::{Countdown, CountdownConfig, CountdownTick};
pub use registry::TimerRegistry;
pub use task::{TimerHandle, spawn_countdown};

use std::fmt;

/// Which window a timer measures. A session holds at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Round,
    Choice,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Round => f.write_str("round"),
            Self::Choice => f.write_str("choice"),
        }
    }
}
