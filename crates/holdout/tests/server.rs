//! Integration tests for the Holdout server: handshake, lobby commands,
//! and whole games played over real WebSocket connections.
//!
//! Sessions run on real time with a 10ms tick, so a round lasts a few
//! dozen milliseconds.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use holdout::{HoldoutServer, ServerConfig};
use holdout_game::GameConfig;
use holdout_protocol::{
    ClientCommand, Envelope, GameEvent, GameResult, LobbyId, LobbyRole, PlayerId,
    PlayerStatus, Reply, ServerMessage, SessionId, SessionStatus,
};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(5);

fn fast_games() -> GameConfig {
    GameConfig {
        round_seconds: 3,
        choice_seconds: 100,
        tick_period: Duration::from_millis(10),
        ..GameConfig::default()
    }
}

/// Rounds long enough that a session is still in round 1 while the test
/// talks to it.
fn slow_games() -> GameConfig {
    GameConfig {
        round_seconds: 60,
        ..GameConfig::default()
    }
}

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    start_server_with(fast_games()).await
}

async fn start_server_with(game: GameConfig) -> String {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        game,
        ..ServerConfig::default()
    };
    let server = HoldoutServer::builder()
        .config(config)
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("should have local addr").to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, seq: u64, body: ClientCommand) {
    let text = serde_json::to_string(&Envelope {
        seq,
        timestamp: 0,
        body,
    })
    .expect("encode");
    ws.send(Message::text(text)).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> Envelope<ServerMessage> {
    let msg = tokio::time::timeout(WAIT, ws.next())
        .await
        .expect("server should answer in time")
        .expect("stream open")
        .expect("valid frame");
    serde_json::from_str(msg.to_text().expect("text frame")).expect("decode")
}

/// Next message that is not a broadcast event.
async fn answer(ws: &mut ClientWs) -> ServerMessage {
    loop {
        match recv(ws).await.body {
            ServerMessage::Event(_) => continue,
            other => return other,
        }
    }
}

/// Skips messages until an event matches.
async fn event_where(ws: &mut ClientWs, pred: impl Fn(&GameEvent) -> bool) -> GameEvent {
    loop {
        if let ServerMessage::Event(event) = recv(ws).await.body {
            if pred(&event) {
                return event;
            }
        }
    }
}

async fn game_result(ws: &mut ClientWs) -> GameResult {
    match event_where(ws, |e| matches!(e, GameEvent::GameResult(_))).await {
        GameEvent::GameResult(result) => result,
        _ => unreachable!(),
    }
}

/// Connects and completes the `Hello` handshake.
async fn player(addr: &str, id: u64) -> ClientWs {
    let mut ws = connect(addr).await;
    send(
        &mut ws,
        0,
        ClientCommand::Hello {
            player_id: PlayerId(id),
            nickname: format!("p{id}"),
        },
    )
    .await;
    match recv(&mut ws).await.body {
        ServerMessage::Welcome { player_id, .. } => assert_eq!(player_id, PlayerId(id)),
        other => panic!("expected Welcome, got {other:?}"),
    }
    ws
}

async fn join(ws: &mut ClientWs, lobby: &str, role: LobbyRole) {
    send(
        ws,
        1,
        ClientCommand::JoinLobby {
            lobby_id: LobbyId::new(lobby),
            role,
        },
    )
    .await;
    assert!(matches!(
        answer(ws).await,
        ServerMessage::Reply(Reply::Joined { .. })
    ));
}

async fn ready(ws: &mut ClientWs) {
    send(ws, 2, ClientCommand::SetReady { ready: true }).await;
    assert_eq!(
        answer(ws).await,
        ServerMessage::Reply(Reply::Ready { ready: true })
    );
}

async fn balance(ws: &mut ClientWs) -> u64 {
    send(ws, 9, ClientCommand::Balance).await;
    match answer(ws).await {
        ServerMessage::Reply(Reply::Balance { balance }) => balance,
        other => panic!("expected Balance, got {other:?}"),
    }
}

fn error_code(msg: &ServerMessage) -> Option<u16> {
    match msg {
        ServerMessage::Error { code, .. } => Some(*code),
        _ => None,
    }
}

async fn start(operator: &mut ClientWs, lobby: &str) -> ServerMessage {
    send(
        operator,
        3,
        ClientCommand::StartSession {
            lobby_id: LobbyId::new(lobby),
        },
    )
    .await;
    answer(operator).await
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_welcome_has_seq_zero() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(
        &mut ws,
        0,
        ClientCommand::Hello {
            player_id: PlayerId(42),
            nickname: "ann".into(),
        },
    )
    .await;

    let env = recv(&mut ws).await;
    assert_eq!(env.seq, 0);
    assert!(matches!(
        env.body,
        ServerMessage::Welcome { player_id: PlayerId(42), .. }
    ));
}

#[tokio::test]
async fn test_handshake_rejects_non_hello_first_frame() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, 0, ClientCommand::Balance).await;
    assert_eq!(error_code(&recv(&mut ws).await.body), Some(400));
}

#[tokio::test]
async fn test_handshake_rejects_second_socket_for_same_player() {
    let addr = start_server().await;
    let _first = player(&addr, 7).await;

    let mut second = connect(&addr).await;
    send(
        &mut second,
        0,
        ClientCommand::Hello {
            player_id: PlayerId(7),
            nickname: "again".into(),
        },
    )
    .await;
    assert_eq!(error_code(&recv(&mut second).await.body), Some(409));
}

#[tokio::test]
async fn test_malformed_frame_is_reported_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = player(&addr, 1).await;

    ws.send(Message::text("not json")).await.unwrap();
    assert_eq!(error_code(&answer(&mut ws).await), Some(400));

    send(&mut ws, 1, ClientCommand::Heartbeat { client_time: 77 }).await;
    let env = recv(&mut ws).await;
    assert_eq!(env.seq, 2, "seq keeps counting across errors");
    assert!(matches!(
        env.body,
        ServerMessage::HeartbeatAck { client_time: 77, .. }
    ));
}

// =========================================================================
// Lobby commands
// =========================================================================

#[tokio::test]
async fn test_ready_takes_stake_and_unready_refunds() {
    let addr = start_server().await;
    let mut ws = player(&addr, 1).await;
    assert_eq!(balance(&mut ws).await, 10);

    join(&mut ws, "main", LobbyRole::Player).await;
    ready(&mut ws).await;
    assert_eq!(balance(&mut ws).await, 9);

    send(&mut ws, 4, ClientCommand::LeaveLobby).await;
    assert_eq!(error_code(&answer(&mut ws).await), Some(400), "ready players cannot leave");

    send(&mut ws, 5, ClientCommand::SetReady { ready: false }).await;
    answer(&mut ws).await;
    assert_eq!(balance(&mut ws).await, 10);

    send(&mut ws, 6, ClientCommand::LeaveLobby).await;
    assert_eq!(answer(&mut ws).await, ServerMessage::Reply(Reply::Left));
}

#[tokio::test]
async fn test_observer_cannot_ready() {
    let addr = start_server().await;
    let mut ws = player(&addr, 1).await;
    join(&mut ws, "main", LobbyRole::Observer).await;

    send(&mut ws, 2, ClientCommand::SetReady { ready: true }).await;
    assert_eq!(error_code(&answer(&mut ws).await), Some(400));
}

#[tokio::test]
async fn test_start_session_requires_operator() {
    let addr = start_server().await;
    let mut ws = player(&addr, 1).await;
    join(&mut ws, "main", LobbyRole::Player).await;
    ready(&mut ws).await;

    assert_eq!(error_code(&start(&mut ws, "main").await), Some(403));
}

#[tokio::test]
async fn test_start_session_without_ready_players_fails() {
    let addr = start_server().await;
    let mut op = player(&addr, 100).await;
    let mut ws = player(&addr, 1).await;
    join(&mut op, "main", LobbyRole::Operator).await;
    join(&mut ws, "main", LobbyRole::Player).await;

    assert_eq!(error_code(&start(&mut op, "main").await), Some(400));
}

#[tokio::test]
async fn test_game_status_before_any_session_is_empty() {
    let addr = start_server().await;
    let mut ws = player(&addr, 1).await;
    send(
        &mut ws,
        1,
        ClientCommand::GameStatus {
            lobby_id: LobbyId::new("main"),
        },
    )
    .await;
    match answer(&mut ws).await {
        ServerMessage::Reply(Reply::GameStatus(view)) => assert!(view.session.is_none()),
        other => panic!("expected GameStatus, got {other:?}"),
    }
}

// =========================================================================
// Games
// =========================================================================

#[tokio::test]
async fn test_solo_player_wins_the_bank() {
    let addr = start_server().await;
    let mut op = player(&addr, 100).await;
    let mut ann = player(&addr, 1).await;
    let mut outsider = player(&addr, 2).await;
    join(&mut op, "main", LobbyRole::Operator).await;
    join(&mut ann, "main", LobbyRole::Player).await;
    join(&mut outsider, "elsewhere", LobbyRole::Player).await;
    ready(&mut ann).await;

    let session = match start(&mut op, "main").await {
        ServerMessage::Reply(Reply::SessionStarted { session }) => session,
        other => panic!("expected SessionStarted, got {other:?}"),
    };
    assert_eq!(session.initial_bank, 1);
    assert_eq!(session.status, SessionStatus::Playing);

    let result = game_result(&mut ann).await;
    assert_eq!(result.winner_id, Some(PlayerId(1)));
    assert_eq!(result.total_awarded(), 1);

    // Observers of the lobby see the same result.
    let seen = game_result(&mut op).await;
    assert_eq!(seen.session.id, session.id);

    // Stake back plus the one-coin bank.
    assert_eq!(balance(&mut ann).await, 10);

    send(
        &mut ann,
        10,
        ClientCommand::PlayerStatus {
            lobby_id: LobbyId::new("main"),
        },
    )
    .await;
    match answer(&mut ann).await {
        ServerMessage::Reply(Reply::PlayerStatus { status: Some(status) }) => {
            assert_eq!(status.status, PlayerStatus::Winner);
            assert_eq!(status.total_coins_earned, 1);
        }
        other => panic!("expected PlayerStatus, got {other:?}"),
    }

    // Nothing from "main" leaked to another lobby.
    send(&mut outsider, 5, ClientCommand::Heartbeat { client_time: 1 }).await;
    assert!(matches!(
        recv(&mut outsider).await.body,
        ServerMessage::HeartbeatAck { .. }
    ));
}

#[tokio::test]
async fn test_four_players_vote_leave_and_split_the_bank() {
    let addr = start_server().await;
    let mut op = player(&addr, 100).await;
    join(&mut op, "main", LobbyRole::Operator).await;

    let mut players = Vec::new();
    for id in 1..=4 {
        let mut ws = player(&addr, id).await;
        join(&mut ws, "main", LobbyRole::Player).await;
        ready(&mut ws).await;
        players.push(ws);
    }

    let session_id = match start(&mut op, "main").await {
        ServerMessage::Reply(Reply::SessionStarted { session }) => {
            assert_eq!(session.initial_bank, 4);
            session.id
        }
        other => panic!("expected SessionStarted, got {other:?}"),
    };

    let active = match event_where(&mut op, |e| {
        matches!(e, GameEvent::ChoicePhaseStarted { .. })
    })
    .await
    {
        GameEvent::ChoicePhaseStarted {
            round,
            active_players,
            ..
        } => {
            assert_eq!(round, 1);
            active_players
        }
        _ => unreachable!(),
    };
    assert_eq!(active.len(), 2);

    let submit = |round: u32| ClientCommand::SubmitChoice {
        session_id,
        round,
        choice: "leave".into(),
    };

    for (index, ws) in players.iter_mut().enumerate() {
        let id = PlayerId(index as u64 + 1);
        send(ws, 20, submit(1)).await;
        let reply = answer(ws).await;
        if active.contains(&id) {
            assert!(matches!(
                reply,
                ServerMessage::Reply(Reply::ChoiceRecorded { round: 1, .. })
            ));
            send(ws, 21, submit(1)).await;
            assert_eq!(error_code(&answer(ws).await), Some(409), "second vote");
        } else {
            assert_eq!(error_code(&reply), Some(404), "eliminated players cannot vote");
        }
    }

    let result = game_result(&mut op).await;
    assert!(result.split_bank);
    assert_eq!(result.coins_per_winner, 2);
    assert_eq!(result.total_awarded(), 4);
    let mut winners = result.split_winners.clone();
    winners.sort();
    let mut expected = active.clone();
    expected.sort();
    assert_eq!(winners, expected);

    for (index, ws) in players.iter_mut().enumerate() {
        let id = PlayerId(index as u64 + 1);
        let expected = if active.contains(&id) { 9 + 2 } else { 9 };
        assert_eq!(balance(ws).await, expected);
    }
}

#[tokio::test]
async fn test_vote_with_unknown_value_is_rejected() {
    let addr = start_server().await;
    let mut ws = player(&addr, 1).await;
    send(
        &mut ws,
        1,
        ClientCommand::SubmitChoice {
            session_id: SessionId(999),
            round: 1,
            choice: "maybe".into(),
        },
    )
    .await;
    assert_eq!(error_code(&answer(&mut ws).await), Some(400));

    send(
        &mut ws,
        2,
        ClientCommand::SubmitChoice {
            session_id: SessionId(999),
            round: 1,
            choice: "stay".into(),
        },
    )
    .await;
    assert_eq!(error_code(&answer(&mut ws).await), Some(404));
}

#[tokio::test]
async fn test_restart_rejected_while_running() {
    let addr = start_server_with(slow_games()).await;
    let mut op = player(&addr, 100).await;
    join(&mut op, "main", LobbyRole::Operator).await;
    let mut players = Vec::new();
    for id in 1..=4 {
        let mut ws = player(&addr, id).await;
        join(&mut ws, "main", LobbyRole::Player).await;
        ready(&mut ws).await;
        players.push(ws);
    }
    assert!(matches!(
        start(&mut op, "main").await,
        ServerMessage::Reply(Reply::SessionStarted { .. })
    ));
    assert_eq!(error_code(&start(&mut op, "main").await), Some(409));
}

#[tokio::test]
async fn test_leaving_mid_game_forfeits() {
    let addr = start_server_with(slow_games()).await;
    let mut op = player(&addr, 100).await;
    join(&mut op, "main", LobbyRole::Operator).await;
    let mut players = Vec::new();
    for id in 1..=4 {
        let mut ws = player(&addr, id).await;
        join(&mut ws, "main", LobbyRole::Player).await;
        ready(&mut ws).await;
        players.push(ws);
    }
    assert!(matches!(
        start(&mut op, "main").await,
        ServerMessage::Reply(Reply::SessionStarted { .. })
    ));

    send(&mut players[0], 30, ClientCommand::LeaveLobby).await;
    assert_eq!(answer(&mut players[0]).await, ServerMessage::Reply(Reply::Left));

    let quit = event_where(&mut op, |e| match e {
        GameEvent::PlayerStatusUpdate { statuses, .. } => statuses
            .iter()
            .any(|s| s.player_id == PlayerId(1) && s.status == PlayerStatus::Quit),
        _ => false,
    })
    .await;
    assert!(matches!(quit, GameEvent::PlayerStatusUpdate { .. }));
}
