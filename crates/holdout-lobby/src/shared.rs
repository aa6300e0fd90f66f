//! Shared handle that plugs the lobby service into the game layer.

use std::sync::Arc;

use holdout_game::{GameError, RosterProvider, Wallet};
use holdout_protocol::{LobbyId, PlayerId, RosterEntry};
use tokio::sync::{Mutex, MutexGuard};

use crate::{LobbyConfig, LobbyService};

/// Cloneable, lock-guarded [`LobbyService`].
///
/// Implements [`RosterProvider`] and [`Wallet`] so a
/// [`GameManager`](holdout_game::GameManager) reads rosters from and pays
/// winners into the same state the connection handlers mutate. Session
/// actors take the lock while crediting, so callers must not hold the
/// guard across a call into the game manager.
#[derive(Clone, Default)]
pub struct SharedLobbies {
    inner: Arc<Mutex<LobbyService>>,
}

impl SharedLobbies {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LobbyService::new(config))),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, LobbyService> {
        self.inner.lock().await
    }
}

impl RosterProvider for SharedLobbies {
    async fn list_ready_players(&self, lobby: &LobbyId) -> Result<Vec<RosterEntry>, GameError> {
        Ok(self.inner.lock().await.registry().ready_players(lobby))
    }

    async fn list_roster(&self, lobby: &LobbyId) -> Result<Vec<RosterEntry>, GameError> {
        Ok(self.inner.lock().await.registry().roster(lobby))
    }

    async fn take_ready_players(&self, lobby: &LobbyId) -> Result<Vec<RosterEntry>, GameError> {
        let staked = self.inner.lock().await.commit_stakes(lobby);
        tracing::debug!(%lobby, stakes = staked.len(), "stakes committed");
        Ok(staked)
    }
}

impl Wallet for SharedLobbies {
    async fn credit(&self, player: PlayerId, amount: u64) -> Result<(), GameError> {
        self.inner.lock().await.ledger_mut().credit(player, amount);
        Ok(())
    }
}
