//! Game manager: starts, tracks, and tears down sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use holdout_protocol::{
    Choice, GameSession, LobbyId, PlayerChoice, PlayerGameStatus, PlayerId, SessionId,
    SessionStatus,
};
use holdout_timer::TimerRegistry;
use tokio::time::Instant;

use crate::session::{SessionDeps, SessionSetup, spawn_session};
use crate::{
    EventSink, GameConfig, GameError, RosterProvider, SessionHandle, SessionPhase,
    SessionSnapshot, Wallet, estimate_rounds,
};

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Owns every session and maps each lobby to its current one.
///
/// This is the entry point for game operations from the server. Each
/// session runs on its own actor with its own timers, so sessions in
/// different lobbies progress independently.
pub struct GameManager<R, W, E> {
    roster: Arc<R>,
    wallet: Arc<W>,
    events: Arc<E>,
    timers: Arc<TimerRegistry<SessionId>>,
    config: GameConfig,
    epoch: Instant,

    /// Live session actors, keyed by session ID.
    sessions: HashMap<SessionId, SessionHandle>,

    /// A lobby has at most ONE session at a time.
    lobbies: HashMap<LobbyId, SessionId>,
}

impl<R, W, E> GameManager<R, W, E>
where
    R: RosterProvider,
    W: Wallet,
    E: EventSink,
{
    pub fn new(config: GameConfig, roster: Arc<R>, wallet: Arc<W>, events: Arc<E>) -> Self {
        Self {
            roster,
            wallet,
            events,
            timers: Arc::new(TimerRegistry::new()),
            config: config.validated(),
            epoch: Instant::now(),
            sessions: HashMap::new(),
            lobbies: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Starts a session for `lobby` with its current ready players.
    ///
    /// The bank is the number of ready players, as returned by
    /// [`RosterProvider::take_ready_players`]. Every eligible roster
    /// member gets an `active` status. A finished session in the same lobby
    /// is torn down and replaced; a running one rejects the start.
    pub async fn start_session(&mut self, lobby: &LobbyId) -> Result<GameSession, GameError> {
        if let Some(existing) = self.lobbies.get(lobby).copied() {
            if let Some(handle) = self.sessions.get(&existing) {
                if let Ok(snapshot) = handle.snapshot().await {
                    if snapshot.phase != SessionPhase::Finished {
                        return Err(GameError::SessionInProgress(lobby.clone()));
                    }
                }
            }
            self.destroy_session(existing).await?;
        }

        let roster = self.roster.list_roster(lobby).await?;
        // Last fallible step: from here on the ready stakes are the bank.
        let ready = self.roster.take_ready_players(lobby).await?;
        if ready.is_empty() {
            return Err(GameError::NoReadyPlayers(lobby.clone()));
        }

        let mut statuses: Vec<PlayerGameStatus> =
            roster.iter().map(PlayerGameStatus::active).collect();
        for entry in &ready {
            if !statuses.iter().any(|s| s.player_id == entry.player_id) {
                statuses.push(PlayerGameStatus::active(entry));
            }
        }

        let session = GameSession {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            lobby_id: lobby.clone(),
            status: SessionStatus::Playing,
            current_round: 1,
            total_rounds: estimate_rounds(ready.len()),
            initial_bank: ready.len() as u64,
            winner_id: None,
            started_at: Some(self.epoch.elapsed().as_millis() as u64),
            finished_at: None,
        };

        let handle = spawn_session(
            SessionSetup {
                session: session.clone(),
                statuses,
                ready,
            },
            self.config.clone(),
            SessionDeps {
                timers: Arc::clone(&self.timers),
                wallet: Arc::clone(&self.wallet),
                events: Arc::clone(&self.events),
                epoch: self.epoch,
            },
        );
        self.sessions.insert(session.id, handle);
        self.lobbies.insert(lobby.clone(), session.id);

        tracing::info!(
            session_id = %session.id,
            lobby_id = %lobby,
            bank = session.initial_bank,
            total_rounds = session.total_rounds,
            "session created"
        );
        Ok(session)
    }

    /// Records a stay/leave vote. `choice` must be exactly `"stay"` or
    /// `"leave"`.
    pub async fn submit_choice(
        &self,
        session_id: SessionId,
        player: PlayerId,
        round: u32,
        choice: &str,
    ) -> Result<PlayerChoice, GameError> {
        let choice: Choice = choice
            .parse()
            .map_err(|_| GameError::InvalidChoiceValue(choice.to_string()))?;
        self.handle(session_id)?
            .submit_choice(player, round, choice)
            .await
    }

    /// The lobby's current session record, or `None` while it is waiting
    /// for its first start.
    pub async fn game_status(&self, lobby: &LobbyId) -> Result<Option<GameSession>, GameError> {
        match self.lobbies.get(lobby) {
            Some(id) => Ok(Some(self.snapshot(*id).await?.session)),
            None => Ok(None),
        }
    }

    /// A player's status in the lobby's current session, if they have one.
    pub async fn player_status(
        &self,
        lobby: &LobbyId,
        player: PlayerId,
    ) -> Result<Option<PlayerGameStatus>, GameError> {
        let Some(id) = self.lobbies.get(lobby) else {
            return Ok(None);
        };
        let snapshot = self.snapshot(*id).await?;
        Ok(snapshot.status_of(player).cloned())
    }

    /// A player left the lobby while its session is running: they quit
    /// the game in the current round. Returns `true` if their status
    /// changed.
    pub async fn forfeit(&self, lobby: &LobbyId, player: PlayerId) -> Result<bool, GameError> {
        match self.lobbies.get(lobby) {
            Some(id) => self.handle(*id)?.forfeit(player).await,
            None => Ok(false),
        }
    }

    pub async fn snapshot(&self, session_id: SessionId) -> Result<SessionSnapshot, GameError> {
        self.handle(session_id)?.snapshot().await
    }

    /// Stops a session's timers and actor and forgets its state.
    pub async fn destroy_session(&mut self, session_id: SessionId) -> Result<(), GameError> {
        let handle = self
            .sessions
            .remove(&session_id)
            .ok_or(GameError::SessionNotFound(session_id))?;

        self.timers.stop_all(&session_id);
        let _ = handle.shutdown().await;
        self.lobbies.retain(|_, sid| *sid != session_id);

        tracing::info!(%session_id, lobby_id = %handle.lobby_id(), "session destroyed");
        Ok(())
    }

    /// Tears down whatever session the lobby has. Returns `true` if there
    /// was one.
    pub async fn teardown_lobby(&mut self, lobby: &LobbyId) -> Result<bool, GameError> {
        match self.lobbies.get(lobby).copied() {
            Some(id) => {
                self.destroy_session(id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn handle(&self, session_id: SessionId) -> Result<&SessionHandle, GameError> {
        self.sessions
            .get(&session_id)
            .ok_or(GameError::SessionNotFound(session_id))
    }

    /// The session currently attached to `lobby`, if any.
    pub fn lobby_session(&self, lobby: &LobbyId) -> Option<SessionId> {
        self.lobbies.get(lobby).copied()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of countdowns still running across all sessions.
    pub fn running_timers(&self) -> usize {
        self.timers.running()
    }
}
