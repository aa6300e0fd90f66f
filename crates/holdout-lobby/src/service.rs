//! Membership and balances behind one lock.

use holdout_protocol::{LobbyId, LobbyRole, PlayerId, RosterEntry};
use serde::{Deserialize, Serialize};

use crate::{Departure, Ledger, LobbyError, LobbyRegistry};

/// Coins a player puts into the bank by readying up. Refunded on unready,
/// kept once a session starts. A session's bank is one coin per ready
/// player, so this is not configurable.
pub const READY_STAKE: u64 = 1;

/// Lobby-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Coins every new account opens with.
    pub starting_balance: u64,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            starting_balance: 10,
        }
    }
}

/// Registry and ledger together, so that readying up and paying the stake
/// happen as one step.
#[derive(Debug)]
pub struct LobbyService {
    registry: LobbyRegistry,
    ledger: Ledger,
}

impl LobbyService {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            registry: LobbyRegistry::new(),
            ledger: Ledger::new(config.starting_balance),
        }
    }

    pub fn registry(&self) -> &LobbyRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn join(
        &mut self,
        lobby: LobbyId,
        player: PlayerId,
        nickname: &str,
        role: LobbyRole,
    ) -> Result<Option<Departure>, LobbyError> {
        self.ledger.open(player);
        self.registry.join(lobby, player, nickname, role)
    }

    pub fn leave(&mut self, player: PlayerId) -> Result<Departure, LobbyError> {
        self.registry.leave(player)
    }

    /// Sets the ready flag, taking the stake on ready and refunding it on
    /// unready. Returns the player's balance afterwards.
    pub fn set_ready(&mut self, player: PlayerId, ready: bool) -> Result<u64, LobbyError> {
        let member = self.registry.member(player)?;
        if member.role != LobbyRole::Player {
            return Err(LobbyError::NotAPlayer(player));
        }
        if member.ready == ready {
            return Ok(self.ledger.balance(player));
        }

        let balance = if ready {
            self.ledger.debit(player, READY_STAKE)?
        } else {
            self.ledger.credit(player, READY_STAKE)
        };
        self.registry.set_ready(player, ready)?;
        tracing::info!(%player, ready, balance, "ready flag changed");
        Ok(balance)
    }

    /// Moves the stakes of every ready player into a session's bank. Clears
    /// the flags without refunding and returns who was ready, so a later
    /// unready is a no-op rather than a refund.
    pub fn commit_stakes(&mut self, lobby: &LobbyId) -> Vec<RosterEntry> {
        let ready = self.registry.ready_players(lobby);
        self.registry.reset_ready(lobby);
        ready
    }

    /// Fails unless `player` is an operator of `lobby`.
    pub fn require_operator(&self, player: PlayerId, lobby: &LobbyId) -> Result<(), LobbyError> {
        let is_operator = self.registry.lobby_of(player) == Some(lobby)
            && self
                .registry
                .member(player)
                .is_ok_and(|m| m.role == LobbyRole::Operator);
        if is_operator {
            Ok(())
        } else {
            Err(LobbyError::NotOperator {
                player,
                lobby: lobby.clone(),
            })
        }
    }
}

impl Default for LobbyService {
    fn default() -> Self {
        Self::new(LobbyConfig::default())
    }
}
