//! Session actor: one Tokio task per running game.
//!
//! The actor owns every mutable piece of a session (the record, the status
//! list, votes, round audits, the RNG) and is the only writer of any of
//! them. Commands arrive on a bounded mpsc channel; timer expiries arrive
//! on a second channel fed by the countdown tasks. Because both are handled
//! on the same task, a vote can never interleave with an elimination or a
//! settlement that is already underway.

use std::collections::HashMap;
use std::sync::Arc;

use holdout_protocol::{
    Choice, GameEvent, GameResult, GameRound, GameSession, LobbyId, PlayerChoice,
    PlayerGameStatus, PlayerId, PlayerStatus, RosterEntry, SessionId, SessionStatus,
};
use holdout_timer::{CountdownConfig, TimerKind, TimerRegistry};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::choice;
use crate::elimination::{self, Elimination};
use crate::outcome::{self, AfterRound, AfterVote, Settlement};
use crate::payout::{self, Payout};
use crate::{EventSink, GameConfig, GameError, SessionPhase, Wallet};

/// Commands sent to a session actor.
pub(crate) enum SessionCommand {
    SubmitChoice {
        player: PlayerId,
        round: u32,
        choice: Choice,
        reply: oneshot::Sender<Result<PlayerChoice, GameError>>,
    },

    /// The player walked away mid-game.
    Forfeit {
        player: PlayerId,
        reply: oneshot::Sender<bool>,
    },

    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },

    Shutdown,
}

/// Sent by a countdown task when it reaches zero.
///
/// `generation` identifies the window the timer was started for. An expiry
/// from an older window is ignored.
#[derive(Debug)]
struct TimerExpired {
    kind: TimerKind,
    generation: u64,
}

/// Point-in-time copy of a session's state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: GameSession,
    pub phase: SessionPhase,
    pub statuses: Vec<PlayerGameStatus>,
    /// Players whose votes and survival still matter.
    pub in_play: Vec<PlayerId>,
    /// Every vote cast so far, ordered by round then player.
    pub choices: Vec<PlayerChoice>,
    pub rounds: Vec<GameRound>,
}

impl SessionSnapshot {
    pub fn status_of(&self, player: PlayerId) -> Option<&PlayerGameStatus> {
        self.statuses.iter().find(|s| s.player_id == player)
    }
}

/// Handle to a running session actor.
///
/// Cheap to clone. The [`GameManager`](crate::GameManager) holds one per
/// session.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    lobby_id: LobbyId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn lobby_id(&self) -> &LobbyId {
        &self.lobby_id
    }

    /// Record a vote for the open choice window.
    pub async fn submit_choice(
        &self,
        player: PlayerId,
        round: u32,
        choice: Choice,
    ) -> Result<PlayerChoice, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::SubmitChoice {
                player,
                round,
                choice,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable(self.session_id))?;
        reply_rx
            .await
            .map_err(|_| GameError::Unavailable(self.session_id))?
    }

    /// Marks an active player as `quit` in the current round. Returns
    /// `false` if they were not active or the session is over.
    pub async fn forfeit(&self, player: PlayerId) -> Result<bool, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Forfeit {
                player,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable(self.session_id))?;
        reply_rx
            .await
            .map_err(|_| GameError::Unavailable(self.session_id))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| GameError::Unavailable(self.session_id))?;
        reply_rx
            .await
            .map_err(|_| GameError::Unavailable(self.session_id))
    }

    /// Tells the actor to stop its timers and exit.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| GameError::Unavailable(self.session_id))
    }
}

/// Everything the manager resolved before the actor starts.
pub(crate) struct SessionSetup {
    pub session: GameSession,
    pub statuses: Vec<PlayerGameStatus>,
    /// The ready list that funded the bank.
    pub ready: Vec<RosterEntry>,
}

/// Shared services every actor borrows from the manager.
pub(crate) struct SessionDeps<W, E> {
    pub timers: Arc<TimerRegistry<SessionId>>,
    pub wallet: Arc<W>,
    pub events: Arc<E>,
    /// Zero point for record timestamps.
    pub epoch: Instant,
}

struct SessionActor<W, E> {
    session: GameSession,
    phase: SessionPhase,
    statuses: Vec<PlayerGameStatus>,
    in_play: Vec<PlayerId>,
    ready: Vec<RosterEntry>,
    choices: HashMap<(u32, PlayerId), PlayerChoice>,
    rounds: Vec<GameRound>,
    config: GameConfig,
    rng: StdRng,
    generation: u64,
    deps: SessionDeps<W, E>,
    commands: mpsc::Receiver<SessionCommand>,
    timer_tx: mpsc::UnboundedSender<TimerExpired>,
    timer_rx: mpsc::UnboundedReceiver<TimerExpired>,
}

impl<W: Wallet, E: EventSink> SessionActor<W, E> {
    fn new(
        setup: SessionSetup,
        config: GameConfig,
        deps: SessionDeps<W, E>,
        commands: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let in_play = setup.statuses.iter().map(|s| s.player_id).collect();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            session: setup.session,
            phase: SessionPhase::Waiting,
            statuses: setup.statuses,
            in_play,
            ready: setup.ready,
            choices: HashMap::new(),
            rounds: Vec::new(),
            config,
            rng,
            generation: 0,
            deps,
            commands,
            timer_tx,
            timer_rx,
        }
    }

    /// Runs the actor loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(
            session_id = %self.session.id,
            lobby_id = %self.session.lobby_id,
            players = self.statuses.len(),
            bank = self.session.initial_bank,
            "session actor started"
        );

        self.begin();

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::SubmitChoice { player, round, choice, reply }) => {
                        let _ = reply.send(self.submit_choice(player, round, choice));
                    }
                    Some(SessionCommand::Forfeit { player, reply }) => {
                        let _ = reply.send(self.forfeit(player));
                    }
                    Some(SessionCommand::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(SessionCommand::Shutdown) | None => break,
                },
                Some(expired) = self.timer_rx.recv() => {
                    self.on_timer_expired(expired).await;
                }
            }
        }

        self.deps.timers.stop_all(&self.session.id);
        tracing::info!(session_id = %self.session.id, "session actor stopped");
    }

    // -- phase transitions -------------------------------------------------

    /// Moves to `target` if the phase machine allows it. An illegal step is
    /// logged and leaves the session where it was.
    fn transition(&mut self, target: SessionPhase) -> bool {
        if !self.phase.can_transition_to(target) {
            tracing::error!(
                session_id = %self.session.id,
                from = %self.phase,
                to = %target,
                "illegal phase transition"
            );
            return false;
        }
        self.phase = target;
        true
    }

    fn begin(&mut self) {
        self.emit(GameEvent::GameStarted {
            session: self.session.clone(),
            players: self.ready.clone(),
        });
        self.start_round();
    }

    fn start_round(&mut self) {
        if !self.transition(SessionPhase::Playing) {
            return;
        }
        let round = self.session.current_round;
        let seconds = self.config.round_seconds;
        tracing::info!(
            session_id = %self.session.id,
            round,
            in_play = self.in_play.len(),
            "round started"
        );
        self.emit(GameEvent::RoundTimerStart {
            session_id: self.session.id,
            round,
            seconds_remaining: seconds,
        });
        self.start_timer(TimerKind::Round, seconds, move |session_id, remaining| {
            GameEvent::RoundTimerTick {
                session_id,
                round,
                seconds_remaining: remaining,
            }
        });
    }

    fn open_choice(&mut self, players: Vec<PlayerId>) {
        if !self.transition(SessionPhase::Choice) {
            return;
        }
        let round = self.session.current_round;
        let seconds = self.config.choice_seconds;
        self.in_play = players;
        tracing::info!(
            session_id = %self.session.id,
            round,
            in_play = self.in_play.len(),
            "choice window opened"
        );
        self.emit(GameEvent::ChoicePhaseStarted {
            session_id: self.session.id,
            round,
            active_players: self.in_play.clone(),
            window_seconds: seconds,
        });
        self.emit(GameEvent::ChoiceTimerStart {
            session_id: self.session.id,
            round,
            seconds_remaining: seconds,
        });
        self.start_timer(TimerKind::Choice, seconds, move |session_id, remaining| {
            GameEvent::ChoiceTimerTick {
                session_id,
                round,
                seconds_remaining: remaining,
            }
        });
    }

    /// Starts the countdown for the current window. Ticks go straight to
    /// the event sink; the expiry comes back to this actor.
    fn start_timer<F>(&mut self, kind: TimerKind, seconds: u32, tick_event: F)
    where
        F: Fn(SessionId, u32) -> GameEvent + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        let session_id = self.session.id;
        let events = Arc::clone(&self.deps.events);
        let expired = self.timer_tx.clone();

        self.deps.timers.start(
            session_id,
            kind,
            CountdownConfig::seconds(seconds).with_period(self.config.tick_period),
            move |remaining| events.emit(tick_event(session_id, remaining)),
            move || {
                let _ = expired.send(TimerExpired { kind, generation });
            },
        );
    }

    async fn on_timer_expired(&mut self, expired: TimerExpired) {
        if expired.generation != self.generation {
            tracing::debug!(
                session_id = %self.session.id,
                kind = %expired.kind,
                generation = expired.generation,
                current = self.generation,
                "stale timer expiry ignored"
            );
            return;
        }
        match (expired.kind, self.phase) {
            (TimerKind::Round, SessionPhase::Playing) => self.close_round().await,
            (TimerKind::Choice, SessionPhase::Choice) => self.close_choice().await,
            (kind, phase) => tracing::debug!(
                session_id = %self.session.id,
                %kind,
                %phase,
                "timer expiry does not match phase, ignoring"
            ),
        }
    }

    /// Round timer hit zero: eliminate half, then settle or open a vote.
    async fn close_round(&mut self) {
        let round = self.session.current_round;
        let before = self.in_play.clone();
        let Elimination {
            eliminated,
            remaining,
        } = elimination::eliminate(&before, &mut self.rng);

        elimination::mark_eliminated(&mut self.statuses, &eliminated, round);
        self.in_play = remaining.clone();

        tracing::info!(
            session_id = %self.session.id,
            round,
            eliminated = eliminated.len(),
            remaining = remaining.len(),
            "round closed"
        );

        if !eliminated.is_empty() {
            self.emit(GameEvent::PlayersEliminated {
                session_id: self.session.id,
                round,
                eliminated: eliminated.clone(),
                remaining_count: remaining.len(),
            });
        }
        self.rounds.push(GameRound {
            round,
            eliminated,
            bank: self.session.initial_bank,
            ended_at: self.now_ms(),
        });
        self.emit_statuses();

        match outcome::after_round(&before, &remaining) {
            AfterRound::Settle(settlement) => self.settle(settlement).await,
            AfterRound::Choice(players) => self.open_choice(players),
        }
    }

    /// Choice timer hit zero: count votes, then settle or advance.
    async fn close_choice(&mut self) {
        let round = self.session.current_round;
        let votes: HashMap<PlayerId, Choice> = self
            .choices
            .values()
            .filter(|c| c.round == round)
            .map(|c| (c.player_id, c.choice))
            .collect();
        let resolution = choice::resolve(&self.in_play, &votes);
        let decision = outcome::after_vote(&self.in_play, &resolution);

        tracing::info!(
            session_id = %self.session.id,
            round,
            stayers = resolution.stayers.len(),
            leave_votes = resolution.leave_votes(),
            silent = resolution.silent.len(),
            "choice window closed"
        );

        // With no stayers the leavers are paid out as winners instead.
        if !resolution.stayers.is_empty() {
            choice::mark_quit(&mut self.statuses, &resolution.leavers, round);
        }
        self.emit_statuses();

        match decision {
            AfterVote::Settle(settlement) => self.settle(settlement).await,
            AfterVote::Advance(stayers) => {
                self.in_play = stayers;
                self.session.current_round += 1;
                self.emit(GameEvent::RoundAdvanced {
                    session_id: self.session.id,
                    round: self.session.current_round,
                    total_rounds: self.session.total_rounds,
                    active_players: self.in_play.clone(),
                });
                self.start_round();
            }
        }
    }

    /// Pays out the bank and finishes the session. A second call on a
    /// finished session does nothing.
    async fn settle(&mut self, settlement: Settlement) {
        if self.session.status == SessionStatus::Finished {
            tracing::debug!(session_id = %self.session.id, "session already settled");
            return;
        }
        if !self.transition(SessionPhase::Finished) {
            return;
        }

        let bank = self.session.initial_bank;
        let payout = match &settlement {
            Settlement::Sole(winner) => payout::sole_winner(bank, *winner),
            Settlement::Split(winners) => payout::split(bank, winners, &mut self.rng),
            Settlement::NoWinner => Payout::none(),
        };
        payout::apply(&mut self.statuses, &payout);

        self.generation += 1;
        self.deps.timers.stop_all(&self.session.id);
        self.session.status = SessionStatus::Finished;
        self.session.winner_id = match settlement {
            Settlement::Sole(winner) => Some(winner),
            _ => None,
        };
        self.session.finished_at = Some(self.now_ms());

        for award in &payout.awards {
            if award.amount == 0 {
                continue;
            }
            if let Err(e) = self.deps.wallet.credit(award.player_id, award.amount).await {
                tracing::error!(
                    session_id = %self.session.id,
                    player_id = %award.player_id,
                    amount = award.amount,
                    error = %e,
                    "failed to credit winner"
                );
            }
        }

        tracing::info!(
            session_id = %self.session.id,
            round = self.session.current_round,
            winners = payout.awards.len(),
            split = payout.split,
            "session finished"
        );

        self.emit_statuses();
        self.emit(GameEvent::GameResult(GameResult {
            session: self.session.clone(),
            winner_id: self.session.winner_id,
            split_winners: if payout.split {
                payout.awards.iter().map(|a| a.player_id).collect()
            } else {
                Vec::new()
            },
            coins_per_winner: payout.per_winner,
            bank_remainder: payout.remainder,
            split_bank: payout.split,
            no_winner: payout.is_no_winner(),
            awards: payout.awards,
            statuses: self.statuses.clone(),
        }));
    }

    // -- commands ----------------------------------------------------------

    fn submit_choice(
        &mut self,
        player: PlayerId,
        round: u32,
        choice: Choice,
    ) -> Result<PlayerChoice, GameError> {
        let session = self.session.id;
        let active = self
            .statuses
            .iter()
            .any(|s| s.player_id == player && s.status == PlayerStatus::Active);
        if !active || !self.in_play.contains(&player) {
            return Err(GameError::PlayerNotActive { player, session });
        }
        if self.phase != SessionPhase::Choice || round != self.session.current_round {
            return Err(GameError::ChoiceWindowClosed { session, round });
        }
        if self.choices.contains_key(&(round, player)) {
            return Err(GameError::DuplicateChoice { player, round });
        }

        let record = PlayerChoice {
            player_id: player,
            round,
            choice,
            made_at: self.now_ms(),
        };
        self.choices.insert((round, player), record.clone());
        tracing::debug!(
            session_id = %session,
            round,
            player_id = %player,
            %choice,
            "choice recorded"
        );
        Ok(record)
    }

    fn forfeit(&mut self, player: PlayerId) -> bool {
        if !self.phase.is_running() {
            return false;
        }
        let round = self.session.current_round;
        let Some(status) = self
            .statuses
            .iter_mut()
            .find(|s| s.player_id == player && s.status == PlayerStatus::Active)
        else {
            return false;
        };
        status.status = PlayerStatus::Quit;
        status.quit_in_round = Some(round);
        self.in_play.retain(|p| *p != player);

        tracing::info!(
            session_id = %self.session.id,
            round,
            player_id = %player,
            "player forfeited"
        );
        self.emit_statuses();
        true
    }

    fn snapshot(&self) -> SessionSnapshot {
        let mut choices: Vec<_> = self.choices.values().cloned().collect();
        choices.sort_by_key(|c| (c.round, c.player_id));
        SessionSnapshot {
            session: self.session.clone(),
            phase: self.phase,
            statuses: self.statuses.clone(),
            in_play: self.in_play.clone(),
            choices,
            rounds: self.rounds.clone(),
        }
    }

    // -- helpers -----------------------------------------------------------

    fn emit(&self, event: GameEvent) {
        tracing::trace!(session_id = %self.session.id, event = event.name(), "emit");
        self.deps.events.emit(event);
    }

    fn emit_statuses(&self) {
        self.emit(GameEvent::PlayerStatusUpdate {
            session_id: self.session.id,
            statuses: self.statuses.clone(),
        });
    }

    fn now_ms(&self) -> u64 {
        self.deps.epoch.elapsed().as_millis() as u64
    }
}

/// Spawns a session actor and returns a handle to it.
pub(crate) fn spawn_session<W: Wallet, E: EventSink>(
    setup: SessionSetup,
    config: GameConfig,
    deps: SessionDeps<W, E>,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let handle = SessionHandle {
        session_id: setup.session.id,
        lobby_id: setup.session.lobby_id.clone(),
        sender: tx,
    };
    let actor = SessionActor::new(setup, config, deps, rx);
    tokio::spawn(actor.run());
    handle
}
