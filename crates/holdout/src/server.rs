//! `HoldoutServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → lobby + game.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use holdout_game::{GameConfig, GameManager};
use holdout_lobby::{LobbyConfig, SharedLobbies};
use holdout_protocol::{JsonCodec, PlayerId};
use holdout_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{EventHub, HoldoutError, ServerConfig};

pub(crate) type Games = GameManager<SharedLobbies, SharedLobbies, EventHub>;

/// Shared server state passed to each connection handler task.
///
/// Lock order: never hold the `lobbies` guard while locking `games`.
/// Session actors lock `lobbies` to credit winners, and the `games` lock
/// is held while waiting on actors.
pub(crate) struct ServerState {
    pub(crate) lobbies: SharedLobbies,
    pub(crate) games: Mutex<Games>,
    pub(crate) hub: Arc<EventHub>,
    /// Players with a live connection. One socket per player.
    pub(crate) online: parking_lot::Mutex<HashSet<PlayerId>>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

impl ServerState {
    pub(crate) fn new(config: ServerConfig) -> Self {
        let lobbies = SharedLobbies::new(config.lobby.clone());
        let hub = Arc::new(EventHub::new(config.event_buffer));
        let shared = Arc::new(lobbies.clone());
        let games = GameManager::new(
            config.game.clone(),
            Arc::clone(&shared),
            shared,
            Arc::clone(&hub),
        );
        Self {
            lobbies,
            games: Mutex::new(games),
            hub,
            online: parking_lot::Mutex::new(HashSet::new()),
            codec: JsonCodec,
            config,
        }
    }
}

/// Builder for configuring and starting a Holdout server.
///
/// # Example
///
/// ```rust,ignore
/// let server = HoldoutServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct HoldoutServerBuilder {
    config: ServerConfig,
}

impl HoldoutServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.config.game = config;
        self
    }

    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.config.lobby = config;
        self
    }

    /// Binds the WebSocket listener. Connections are not accepted until
    /// [`HoldoutServer::run`].
    pub async fn build(self) -> Result<HoldoutServer, HoldoutError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        Ok(HoldoutServer {
            transport,
            state: Arc::new(ServerState::new(self.config)),
        })
    }
}

impl Default for HoldoutServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Holdout game server.
pub struct HoldoutServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl HoldoutServer {
    pub fn builder() -> HoldoutServerBuilder {
        HoldoutServerBuilder::new()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, HoldoutError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop, spawning a handler task per connection. Runs
    /// until the process is terminated.
    pub async fn run(mut self) -> Result<(), HoldoutError> {
        tracing::info!(
            round_seconds = self.state.config.game.round_seconds,
            choice_seconds = self.state.config.game.choice_seconds,
            "Holdout server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
