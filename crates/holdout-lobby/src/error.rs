//! Error types for the lobby layer.

use holdout_protocol::{LobbyId, PlayerId};

/// Errors that can occur during lobby and wallet operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The player has not joined any lobby.
    #[error("player {0} is not in a lobby")]
    NotInLobby(PlayerId),

    /// The player is already a member of this lobby.
    #[error("player {0} already in lobby {1}")]
    AlreadyInLobby(PlayerId, LobbyId),

    /// A ready player has a stake on the table and must unready first.
    #[error("player {0} cannot leave while ready")]
    LeaveWhileReady(PlayerId),

    /// Observers and operators cannot ready up.
    #[error("player {0} is not a player in their lobby")]
    NotAPlayer(PlayerId),

    /// Only an operator of the lobby may run this command.
    #[error("player {player} is not an operator of lobby {lobby}")]
    NotOperator { player: PlayerId, lobby: LobbyId },

    #[error("player {player} has {balance} coins, needs {needed}")]
    InsufficientFunds {
        player: PlayerId,
        balance: u64,
        needed: u64,
    },
}
