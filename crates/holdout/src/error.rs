//! Unified error type for the Holdout server.

use holdout_game::GameError;
use holdout_lobby::LobbyError;
use holdout_protocol::ProtocolError;
use holdout_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Handlers return this and let `?` convert sub-crate errors. Anything that
/// should reach the client is turned into a wire error with
/// [`code`](Self::code).
#[derive(Debug, thiserror::Error)]
pub enum HoldoutError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// A bad environment variable or setting.
    #[error("config: {0}")]
    Config(String),

    /// The player is already connected on another socket.
    #[error("player {0} is already connected")]
    AlreadyConnected(holdout_protocol::PlayerId),
}

impl HoldoutError {
    /// HTTP-style status code sent in `ServerMessage::Error`.
    pub fn code(&self) -> u16 {
        match self {
            Self::Protocol(_) | Self::Config(_) => 400,
            Self::AlreadyConnected(_) => 409,
            Self::Transport(_) => 500,
            Self::Lobby(e) => match e {
                LobbyError::NotOperator { .. } => 403,
                LobbyError::AlreadyInLobby(..) => 409,
                LobbyError::NotInLobby(_)
                | LobbyError::LeaveWhileReady(_)
                | LobbyError::NotAPlayer(_)
                | LobbyError::InsufficientFunds { .. } => 400,
            },
            Self::Game(e) => match e {
                GameError::NoReadyPlayers(_) | GameError::InvalidChoiceValue(_) => 400,
                GameError::SessionNotFound(_) | GameError::PlayerNotActive { .. } => 404,
                GameError::DuplicateChoice { .. }
                | GameError::ChoiceWindowClosed { .. }
                | GameError::SessionInProgress(_) => 409,
                GameError::Unavailable(_) => 503,
                GameError::Collaborator(_) => 500,
            },
        }
    }
}
