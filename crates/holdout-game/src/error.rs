//! Error types for the game layer.

use holdout_protocol::{LobbyId, PlayerId, SessionId};

/// Errors returned by session commands.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No ready, non-observer, non-operator player in the lobby.
    #[error("lobby {0} has no ready players")]
    NoReadyPlayers(LobbyId),

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The player has no `active` status that is still in play.
    #[error("player {player} is not active in session {session}")]
    PlayerNotActive { player: PlayerId, session: SessionId },

    /// A choice was already recorded for this player and round.
    #[error("player {player} already chose in round {round}")]
    DuplicateChoice { player: PlayerId, round: u32 },

    /// Anything other than `stay` or `leave`.
    #[error("invalid choice value: {0:?}")]
    InvalidChoiceValue(String),

    /// The vote arrived outside the open window for that round.
    #[error("choice window for round {round} of session {session} is not open")]
    ChoiceWindowClosed { session: SessionId, round: u32 },

    /// The lobby's current session has not finished yet.
    #[error("lobby {0} already has a session in progress")]
    SessionInProgress(LobbyId),

    /// The session actor's channel is full or closed.
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),

    /// The roster provider or wallet failed.
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}
