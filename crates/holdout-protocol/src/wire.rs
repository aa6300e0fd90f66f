//! Client/server wire messages.
//!
//! Every frame is an [`Envelope`] around either a [`ClientCommand`] (client →
//! server) or a [`ServerMessage`] (server → client). Commands are
//! internally tagged by `"type"`; server messages are adjacently tagged
//! (`"type"` + `"data"`) so an embedded [`GameEvent`] keeps its own
//! `"event"` tag untouched.

use serde::{Deserialize, Serialize};

use crate::{
    Choice, GameEvent, GameSession, LobbyId, PlayerGameStatus, PlayerId, SessionId,
};

/// Frame wrapper carrying ordering metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Per-direction sequence number, starting at 0 for the handshake.
    pub seq: u64,
    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,
    pub body: T,
}

/// Commands a client may send after the `Hello` handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// First frame on every connection: who this socket speaks for.
    Hello { player_id: PlayerId, nickname: String },

    JoinLobby {
        lobby_id: LobbyId,
        #[serde(default)]
        role: LobbyRole,
    },

    LeaveLobby,

    SetReady { ready: bool },

    /// Operator command: start the game for a lobby with its ready roster.
    StartSession { lobby_id: LobbyId },

    /// Vote during an open choice window. `choice` stays a raw string so an
    /// unknown spelling reaches the game layer and is reported as such.
    SubmitChoice {
        session_id: SessionId,
        round: u32,
        choice: String,
    },

    GameStatus { lobby_id: LobbyId },

    PlayerStatus { lobby_id: LobbyId },

    Balance,

    Heartbeat { client_time: u64 },
}

/// How a connection participates in a lobby.
///
/// Only `Player` members are counted in the roster; observers watch and
/// operators run the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyRole {
    #[default]
    Player,
    Observer,
    Operator,
}

/// Lobby-level view of the current game.
///
/// `session` is `None` while the lobby is still waiting for its first start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatusView {
    pub lobby_id: LobbyId,
    pub session: Option<GameSession>,
}

/// Synchronous answers to a [`ClientCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Joined { lobby_id: LobbyId },
    Left,
    Ready { ready: bool },
    SessionStarted { session: GameSession },
    ChoiceRecorded { round: u32, choice: Choice },
    GameStatus(GameStatusView),
    PlayerStatus { status: Option<PlayerGameStatus> },
    Balance { balance: u64 },
}

/// Everything the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { player_id: PlayerId, server_time: u64 },
    HeartbeatAck { client_time: u64, server_time: u64 },
    Reply(Reply),
    /// `code` follows HTTP conventions (400 bad request, 404 not found,
    /// 409 conflict).
    Error { code: u16, message: String },
    Event(GameEvent),
}
