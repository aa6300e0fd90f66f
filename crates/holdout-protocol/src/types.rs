//! Identities and game records.
//!
//! These are the shapes the orchestrator owns and clients observe. They
//! serialize to flat JSON with snake_case enum values so a browser client
//! can consume them without a translation layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player (also the wallet owner).
///
/// `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for one run of the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A lobby name. Lobbies are created by operators and named freely, so
/// this wraps a string rather than a counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(pub String);

impl LobbyId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Persisted lifecycle of a [`GameSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Playing => f.write_str("playing"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Where a player stands within one session.
///
/// Everything except `Active` is terminal: once a player is eliminated,
/// has quit, or has won, their status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Eliminated,
    Quit,
    Winner,
}

impl PlayerStatus {
    /// Returns `true` for every status other than `Active`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Eliminated => f.write_str("eliminated"),
            Self::Quit => f.write_str("quit"),
            Self::Winner => f.write_str("winner"),
        }
    }
}

/// A vote cast during a choice phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Stay,
    Leave,
}

impl FromStr for Choice {
    type Err = ProtocolError;

    /// Parses the wire spelling (`"stay"` / `"leave"`). Anything else is
    /// rejected rather than coerced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stay" => Ok(Self::Stay),
            "leave" => Ok(Self::Leave),
            other => Err(ProtocolError::InvalidValue(format!(
                "choice must be \"stay\" or \"leave\", got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stay => f.write_str("stay"),
            Self::Leave => f.write_str("leave"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A lobby member as reported by the roster provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub nickname: String,
}

/// One run of the game for a lobby.
///
/// `initial_bank` is fixed when the session starts and is the whole prize
/// pool no matter how many rounds actually run. `total_rounds` is only an
/// estimate shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: SessionId,
    pub lobby_id: LobbyId,
    pub status: SessionStatus,
    pub current_round: u32,
    pub total_rounds: u32,
    pub initial_bank: u64,
    pub winner_id: Option<PlayerId>,
    /// Milliseconds since the Unix epoch.
    pub started_at: Option<u64>,
    /// Milliseconds since the Unix epoch.
    pub finished_at: Option<u64>,
}

/// A player's standing within one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerGameStatus {
    pub player_id: PlayerId,
    pub nickname: String,
    pub status: PlayerStatus,
    pub eliminated_in_round: Option<u32>,
    pub quit_in_round: Option<u32>,
    /// Written once, at settlement.
    pub total_coins_earned: u64,
}

impl PlayerGameStatus {
    /// A fresh `Active` status for a roster member.
    pub fn active(entry: &RosterEntry) -> Self {
        Self {
            player_id: entry.player_id,
            nickname: entry.nickname.clone(),
            status: PlayerStatus::Active,
            eliminated_in_round: None,
            quit_in_round: None,
            total_coins_earned: 0,
        }
    }
}

/// A single stay/leave vote for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerChoice {
    pub player_id: PlayerId,
    pub round: u32,
    pub choice: Choice,
    /// Milliseconds since the Unix epoch.
    pub made_at: u64,
}

/// Audit record for a closed round. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRound {
    pub round: u32,
    pub eliminated: Vec<PlayerId>,
    pub bank: u64,
    /// Milliseconds since the Unix epoch.
    pub ended_at: u64,
}
