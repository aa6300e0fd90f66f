//! Session configuration and phase machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Settings shared by every session a [`GameManager`](crate::GameManager)
/// starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Length of each round's countdown, in ticks.
    pub round_seconds: u32,

    /// Length of the stay/leave window, in ticks.
    pub choice_seconds: u32,

    /// Wall time per tick. One second outside of tests.
    pub tick_period: Duration,

    /// Command channel capacity for each session actor.
    pub channel_size: usize,

    /// Fixed seed for elimination draws and payout order. `None` seeds
    /// every session from the thread RNG.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_seconds: 15,
            choice_seconds: 10,
            tick_period: Duration::from_secs(1),
            channel_size: 64,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Clamp values that would stall or spin a session.
    pub fn validated(mut self) -> Self {
        if self.round_seconds == 0 {
            tracing::warn!("round_seconds is 0, clamping to 1");
            self.round_seconds = 1;
        }
        if self.choice_seconds == 0 {
            tracing::warn!("choice_seconds is 0, clamping to 1");
            self.choice_seconds = 1;
        }
        if self.tick_period < Duration::from_millis(1) {
            tracing::warn!("tick_period below 1ms, clamping");
            self.tick_period = Duration::from_millis(1);
        }
        if self.channel_size == 0 {
            self.channel_size = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where a session actor is in its loop.
///
/// ```text
/// Waiting → Playing(n) → Choice(n) → Playing(n+1) → … → Finished
///                 ↘                ↘
///                  Finished          Finished
/// ```
///
/// Elimination and vote resolution are not phases of their own: they run
/// to completion inside the timer-expiry handler, so no command can
/// observe a half-applied round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Waiting,
    Playing,
    Choice,
    Finished,
}

impl SessionPhase {
    /// Returns `true` while timers may still fire for this session.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Playing | Self::Choice)
    }

    /// Returns `true` if moving to `target` is a legal step.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Playing)
                | (Self::Playing, Self::Choice)
                | (Self::Playing, Self::Finished)
                | (Self::Choice, Self::Playing)
                | (Self::Choice, Self::Finished)
        )
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Playing => write!(f, "Playing"),
            Self::Choice => write!(f, "Choice"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
