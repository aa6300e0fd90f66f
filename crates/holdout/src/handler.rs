//! Per-connection handler: handshake, command dispatch, and event push.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `Hello` and answer `Welcome`
//!   2. Spawn a writer task that owns the outbound sequence numbers and
//!      merges command replies with the events of the player's lobby
//!   3. Loop: receive commands, dispatch, queue the reply or error
//!   4. On close: unready, leave the lobby, forfeit a running game

use std::sync::Arc;
use std::time::Instant;

use holdout_lobby::Departure;
use holdout_protocol::{
    ClientCommand, Codec, Envelope, GameStatusView, JsonCodec, LobbyId, PlayerId,
    ProtocolError, Reply, ServerMessage,
};
use holdout_transport::{Connection, WebSocketConnection};
use tokio::sync::{broadcast, mpsc, watch};

use crate::hub::LobbyEvent;
use crate::server::ServerState;
use crate::HoldoutError;

/// Replies queued ahead of the writer task.
const OUTBOUND_BUFFER: usize = 64;

/// Releases a player's seat when the handler exits, even on panic.
///
/// `Drop` is synchronous, so the lobby and game cleanup runs on a spawned
/// task.
struct ConnectionGuard {
    player_id: PlayerId,
    state: Arc<ServerState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = disconnect(&state, player_id).await {
                tracing::warn!(%player_id, error = %e, "disconnect cleanup failed");
            }
            state.online.lock().remove(&player_id);
        });
    }
}

/// What one connection knows about itself while dispatching commands.
struct Client<'a> {
    state: &'a ServerState,
    player_id: PlayerId,
    nickname: String,
    /// The lobby whose events this connection receives.
    lobby: watch::Sender<Option<LobbyId>>,
    start: Instant,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), HoldoutError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let start = Instant::now();
    tracing::debug!(%conn_id, "handling new connection");

    let (guard, nickname) = perform_handshake(&conn, &state, &start).await?;
    let player_id = guard.player_id;
    tracing::info!(%conn_id, %player_id, %nickname, "player connected");

    let (lobby_tx, lobby_rx) = watch::channel(None);
    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        state.codec,
        state.hub.subscribe(),
        out_rx,
        lobby_rx,
        start,
    ));

    let client = Client {
        state: &state,
        player_id,
        nickname,
        lobby: lobby_tx,
        start,
    };

    loop {
        let text = match tokio::time::timeout(state.config.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(text))) => text,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        };

        let reply = match state.codec.decode::<Envelope<ClientCommand>>(text.as_bytes()) {
            Ok(envelope) => match client.dispatch(envelope.body).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::debug!(%player_id, error = %e, "command rejected");
                    error_message(&e)
                }
            },
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                error_message(&e.into())
            }
        };

        if out_tx.send(reply).await.is_err() {
            // writer is gone, so is the socket
            break;
        }
    }

    drop(out_tx);
    let _ = writer.await;
    let _ = conn.close().await;
    // guard drops here → lobby cleanup fires.
    drop(guard);
    Ok(())
}

/// Waits for `Hello`, claims the player id, and answers `Welcome`.
async fn perform_handshake(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    start: &Instant,
) -> Result<(ConnectionGuard, String), HoldoutError> {
    let text = match tokio::time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(text))) => text,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before hello".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("hello timed out".into()).into());
        }
    };

    let hello = state
        .codec
        .decode::<Envelope<ClientCommand>>(text.as_bytes())
        .map_err(HoldoutError::from)
        .and_then(|envelope| match envelope.body {
            ClientCommand::Hello {
                player_id,
                nickname,
            } if !nickname.trim().is_empty() => Ok((player_id, nickname)),
            ClientCommand::Hello { .. } => {
                Err(ProtocolError::InvalidValue("nickname must not be empty".into()).into())
            }
            _ => Err(ProtocolError::InvalidMessage("first message must be hello".into()).into()),
        });
    let (player_id, nickname) = match hello {
        Ok(hello) => hello,
        Err(e) => {
            send_message(conn, &state.codec, 0, start, error_message(&e)).await?;
            return Err(e);
        }
    };

    if !state.online.lock().insert(player_id) {
        let e = HoldoutError::AlreadyConnected(player_id);
        send_message(conn, &state.codec, 0, start, error_message(&e)).await?;
        return Err(e);
    }
    let guard = ConnectionGuard {
        player_id,
        state: Arc::clone(state),
    };

    state.lobbies.lock().await.ledger_mut().open(player_id);

    let welcome = ServerMessage::Welcome {
        player_id,
        server_time: millis(start),
    };
    send_message(conn, &state.codec, 0, start, welcome).await?;
    Ok((guard, nickname))
}

impl Client<'_> {
    async fn dispatch(&self, command: ClientCommand) -> Result<ServerMessage, HoldoutError> {
        let state = self.state;
        let player_id = self.player_id;

        let reply = match command {
            ClientCommand::Hello { .. } => {
                return Err(ProtocolError::InvalidMessage("already said hello".into()).into());
            }

            ClientCommand::Heartbeat { client_time } => {
                return Ok(ServerMessage::HeartbeatAck {
                    client_time,
                    server_time: millis(&self.start),
                });
            }

            ClientCommand::JoinLobby { lobby_id, role } => {
                let moved = state.lobbies.lock().await.join(
                    lobby_id.clone(),
                    player_id,
                    &self.nickname,
                    role,
                )?;
                self.lobby.send_replace(Some(lobby_id.clone()));
                if let Some(departure) = moved {
                    after_departure(state, player_id, &departure).await?;
                }
                Reply::Joined { lobby_id }
            }

            ClientCommand::LeaveLobby => {
                let departure = state.lobbies.lock().await.leave(player_id)?;
                self.lobby.send_replace(None);
                after_departure(state, player_id, &departure).await?;
                Reply::Left
            }

            ClientCommand::SetReady { ready } => {
                state.lobbies.lock().await.set_ready(player_id, ready)?;
                Reply::Ready { ready }
            }

            ClientCommand::StartSession { lobby_id } => {
                state
                    .lobbies
                    .lock()
                    .await
                    .require_operator(player_id, &lobby_id)?;
                // Reading the ready list commits the stakes in the same lock.
                let session = state.games.lock().await.start_session(&lobby_id).await?;
                tracing::info!(
                    session_id = %session.id,
                    %lobby_id,
                    operator = %player_id,
                    stakes = session.initial_bank,
                    "session started"
                );
                Reply::SessionStarted { session }
            }

            ClientCommand::SubmitChoice {
                session_id,
                round,
                choice,
            } => {
                let recorded = state
                    .games
                    .lock()
                    .await
                    .submit_choice(session_id, player_id, round, &choice)
                    .await?;
                Reply::ChoiceRecorded {
                    round: recorded.round,
                    choice: recorded.choice,
                }
            }

            ClientCommand::GameStatus { lobby_id } => {
                let session = state.games.lock().await.game_status(&lobby_id).await?;
                Reply::GameStatus(GameStatusView { lobby_id, session })
            }

            ClientCommand::PlayerStatus { lobby_id } => {
                let status = state
                    .games
                    .lock()
                    .await
                    .player_status(&lobby_id, player_id)
                    .await?;
                Reply::PlayerStatus { status }
            }

            ClientCommand::Balance => Reply::Balance {
                balance: state.lobbies.lock().await.ledger().balance(player_id),
            },
        };

        Ok(ServerMessage::Reply(reply))
    }
}

/// Game-side effects of a player leaving a lobby: the last one out tears
/// the session down, anyone else forfeits a running game.
async fn after_departure(
    state: &ServerState,
    player_id: PlayerId,
    departure: &Departure,
) -> Result<(), HoldoutError> {
    let mut games = state.games.lock().await;
    if departure.closed {
        if let Some(session_id) = games.lobby_session(&departure.lobby_id) {
            games.teardown_lobby(&departure.lobby_id).await?;
            state.hub.forget(session_id);
        }
    } else if games.forfeit(&departure.lobby_id, player_id).await? {
        tracing::info!(%player_id, lobby_id = %departure.lobby_id, "player forfeited by leaving");
    }
    Ok(())
}

/// Frees the player's lobby seat after the socket closed. A ready player
/// gets their stake back first.
async fn disconnect(state: &ServerState, player_id: PlayerId) -> Result<(), HoldoutError> {
    let departure = {
        let mut lobbies = state.lobbies.lock().await;
        let Ok(member) = lobbies.registry().member(player_id) else {
            return Ok(());
        };
        if member.ready {
            lobbies.set_ready(player_id, false)?;
        }
        lobbies.leave(player_id)?
    };
    after_departure(state, player_id, &departure).await
}

/// Owns the socket's send side: replies in order, plus every event for
/// the lobby the player is currently in.
async fn write_loop(
    conn: Arc<WebSocketConnection>,
    codec: JsonCodec,
    mut events: broadcast::Receiver<LobbyEvent>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    lobby: watch::Receiver<Option<LobbyId>>,
    start: Instant,
) {
    let mut seq: u64 = 1;
    loop {
        let message = tokio::select! {
            biased;
            reply = outbound.recv() => match reply {
                Some(reply) => reply,
                None => break,
            },
            event = events.recv() => match event {
                Ok(LobbyEvent { lobby_id, event }) => {
                    if lobby.borrow().as_ref() != Some(&lobby_id) {
                        continue;
                    }
                    ServerMessage::Event(event)
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(conn_id = %conn.id(), skipped, "event stream lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        if let Err(e) = send_message(&conn, &codec, next_seq(&mut seq), &start, message).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed");
            break;
        }
    }
}

async fn send_message(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    seq: u64,
    start: &Instant,
    body: ServerMessage,
) -> Result<(), HoldoutError> {
    let envelope = Envelope {
        seq,
        timestamp: millis(start),
        body,
    };
    let bytes = codec.encode(&envelope)?;
    let text =
        String::from_utf8(bytes).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;
    conn.send(&text).await?;
    Ok(())
}

fn error_message(err: &HoldoutError) -> ServerMessage {
    ServerMessage::Error {
        code: err.code(),
        message: err.to_string(),
    }
}

fn millis(start: &Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
