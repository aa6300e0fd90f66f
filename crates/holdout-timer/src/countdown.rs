//! Fixed-cadence countdown scheduler.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How long a countdown runs and how often it ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownConfig {
    /// Number of ticks before expiry. 0 expires immediately.
    pub seconds: u32,
    /// Time between ticks. Default: one second.
    pub period: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            seconds: 0,
            period: Duration::from_secs(1),
        }
    }
}

impl CountdownConfig {
    /// Shortest period accepted. Anything below is clamped up to it.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// A countdown of `seconds` ticks at the default one-second cadence.
    pub fn seconds(seconds: u32) -> Self {
        Self {
            seconds,
            ..Default::default()
        }
    }

    /// Overrides the tick period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`Countdown::new`].
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_us = self.period.as_micros() as u64,
                "countdown period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        self
    }

    /// Total wall time from start to expiry.
    pub fn total(&self) -> Duration {
        self.period * self.seconds
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// One decrement, returned by [`Countdown::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    /// Seconds left after this decrement. The final tick carries 0.
    pub remaining: u32,
    /// `true` if this tick woke more than 10% of a period late.
    pub overrun: bool,
}

impl CountdownTick {
    pub fn is_final(&self) -> bool {
        self.remaining == 0
    }
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Counts down from `seconds` to zero, one decrement per period.
///
/// Late wake-ups do not shift the cadence: the next tick stays on the
/// original schedule, so a 15-second round ends 15 periods after it
/// started even if one tick was delayed.
#[derive(Debug)]
pub struct Countdown {
    config: CountdownConfig,
    remaining: u32,
    next_tick: TokioInstant,
    overruns: u64,
}

impl Countdown {
    pub fn new(config: CountdownConfig) -> Self {
        let config = config.validated();
        debug!(
            seconds = config.seconds,
            period_ms = config.period.as_millis() as u64,
            "countdown created"
        );
        Self {
            remaining: config.seconds,
            next_tick: TokioInstant::now() + config.period,
            config,
            overruns: 0,
        }
    }

    /// Wait for the next decrement.
    ///
    /// Once the countdown has reached zero this future pends forever, so it
    /// can sit in a `tokio::select!` without firing again.
    pub async fn wait_for_tick(&mut self) -> CountdownTick {
        if self.remaining == 0 {
            std::future::pending::<()>().await;
            unreachable!()
        }

        let scheduled = self.next_tick;
        time::sleep_until(scheduled).await;

        let now = TokioInstant::now();
        let late_by = now.saturating_duration_since(scheduled);
        let overrun = late_by > self.config.period / 10;
        if overrun {
            self.overruns += 1;
            warn!(
                remaining = self.remaining,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "countdown tick late, keeping original cadence"
            );
        }

        self.next_tick = scheduled + self.config.period;
        self.remaining -= 1;
        trace!(remaining = self.remaining, overrun, "countdown tick");

        CountdownTick {
            remaining: self.remaining,
            overrun,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    /// Ticks that fired late so far.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}
