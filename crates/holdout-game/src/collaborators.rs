//! Hooks into the systems a session depends on but does not own.
//!
//! The game layer never stores lobby membership or balances. It reads the
//! roster once when a session starts, credits winners once when it settles,
//! and pushes every state change out through an [`EventSink`]. Each of these
//! is a trait so the server can plug in its lobby registry and broadcast
//! hub, and tests can plug in plain vectors and channels.

use holdout_protocol::{GameEvent, LobbyId, PlayerId, RosterEntry};

use crate::GameError;

/// Reads who is in a lobby.
///
/// Both lists exclude observer and operator accounts.
pub trait RosterProvider: Send + Sync + 'static {
    /// Players who have marked themselves ready. Their count funds the bank.
    fn list_ready_players(
        &self,
        lobby: &LobbyId,
    ) -> impl std::future::Future<Output = Result<Vec<RosterEntry>, GameError>> + Send;

    /// Every eligible member, ready or not. Each gets an `active` status
    /// when a session starts.
    fn list_roster(
        &self,
        lobby: &LobbyId,
    ) -> impl std::future::Future<Output = Result<Vec<RosterEntry>, GameError>> + Send;

    /// The ready list at the moment a session starts. Providers that hold
    /// stakes must read the list and commit those stakes as one step, so
    /// nobody can be refunded after being counted into the bank.
    ///
    /// Defaults to [`list_ready_players`](Self::list_ready_players).
    fn take_ready_players(
        &self,
        lobby: &LobbyId,
    ) -> impl std::future::Future<Output = Result<Vec<RosterEntry>, GameError>> + Send {
        self.list_ready_players(lobby)
    }
}

/// Pays out winnings.
pub trait Wallet: Send + Sync + 'static {
    /// Add `amount` coins to the player's balance.
    fn credit(
        &self,
        player: PlayerId,
        amount: u64,
    ) -> impl std::future::Future<Output = Result<(), GameError>> + Send;
}

/// Receives every event a session emits.
///
/// Fire-and-forget: `emit` must not block, and a sink with no listeners
/// simply drops the event. It is called from timer tasks as well as from
/// the session actor.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: GameEvent);
}
