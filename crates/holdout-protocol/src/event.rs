//! Broadcast events emitted by a running session.
//!
//! Events are fire-and-forget: the orchestrator emits them in order and
//! does not wait for delivery. A client that misses one catches up from
//! the next `player_status_update` or `game_result`, both of which carry
//! the full status list.

use serde::{Deserialize, Serialize};

use crate::{GameSession, PlayerGameStatus, PlayerId, RosterEntry, SessionId};

/// Coins awarded to one winner at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub player_id: PlayerId,
    pub amount: u64,
}

/// Final outcome of a session.
///
/// Exactly one shape applies:
/// - sole winner: `winner_id` is set, `split_bank` and `no_winner` are false;
/// - split: `split_bank` is true and `split_winners` lists everyone paid;
/// - no winner: `no_winner` is true and `awards` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub session: GameSession,
    pub winner_id: Option<PlayerId>,
    pub split_winners: Vec<PlayerId>,
    pub awards: Vec<Award>,
    pub coins_per_winner: u64,
    pub bank_remainder: u64,
    pub statuses: Vec<PlayerGameStatus>,
    pub split_bank: bool,
    pub no_winner: bool,
}

impl GameResult {
    /// Sum of every award. Equals the bank whenever anyone was paid.
    pub fn total_awarded(&self) -> u64 {
        self.awards.iter().map(|a| a.amount).sum()
    }
}

/// Everything a session broadcasts, tagged by `"event"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// The operator started a session; `players` is the ready list that
    /// funded the bank.
    GameStarted {
        session: GameSession,
        players: Vec<RosterEntry>,
    },

    RoundTimerStart {
        session_id: SessionId,
        round: u32,
        seconds_remaining: u32,
    },

    RoundTimerTick {
        session_id: SessionId,
        round: u32,
        seconds_remaining: u32,
    },

    PlayersEliminated {
        session_id: SessionId,
        round: u32,
        eliminated: Vec<PlayerId>,
        remaining_count: usize,
    },

    ChoicePhaseStarted {
        session_id: SessionId,
        round: u32,
        active_players: Vec<PlayerId>,
        window_seconds: u32,
    },

    ChoiceTimerStart {
        session_id: SessionId,
        round: u32,
        seconds_remaining: u32,
    },

    ChoiceTimerTick {
        session_id: SessionId,
        round: u32,
        seconds_remaining: u32,
    },

    /// Full status list, sent after every status mutation.
    PlayerStatusUpdate {
        session_id: SessionId,
        statuses: Vec<PlayerGameStatus>,
    },

    RoundAdvanced {
        session_id: SessionId,
        round: u32,
        total_rounds: u32,
        active_players: Vec<PlayerId>,
    },

    GameResult(GameResult),
}

impl GameEvent {
    /// The session this event belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::GameStarted { session, .. } => session.id,
            Self::GameResult(result) => result.session.id,
            Self::RoundTimerStart { session_id, .. }
            | Self::RoundTimerTick { session_id, .. }
            | Self::PlayersEliminated { session_id, .. }
            | Self::ChoicePhaseStarted { session_id, .. }
            | Self::ChoiceTimerStart { session_id, .. }
            | Self::ChoiceTimerTick { session_id, .. }
            | Self::PlayerStatusUpdate { session_id, .. }
            | Self::RoundAdvanced { session_id, .. } => *session_id,
        }
    }

    /// Wire name of the event, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GameStarted { .. } => "game_started",
            Self::RoundTimerStart { .. } => "round_timer_start",
            Self::RoundTimerTick { .. } => "round_timer_tick",
            Self::PlayersEliminated { .. } => "players_eliminated",
            Self::ChoicePhaseStarted { .. } => "choice_phase_started",
            Self::ChoiceTimerStart { .. } => "choice_timer_start",
            Self::ChoiceTimerTick { .. } => "choice_timer_tick",
            Self::PlayerStatusUpdate { .. } => "player_status_update",
            Self::RoundAdvanced { .. } => "round_advanced",
            Self::GameResult(_) => "game_result",
        }
    }

    /// Returns `true` for per-second countdown ticks, which are the bulk of
    /// traffic and the only events a slow client may safely drop.
    pub fn is_tick(&self) -> bool {
        matches!(self, Self::RoundTimerTick { .. } | Self::ChoiceTimerTick { .. })
    }
}
