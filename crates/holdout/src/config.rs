//! Server settings.

use std::time::Duration;

use holdout_game::GameConfig;
use holdout_lobby::LobbyConfig;

use crate::HoldoutError;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub game: GameConfig,
    pub lobby: LobbyConfig,

    /// How long a new socket has to send `Hello`.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,

    /// Capacity of the event broadcast channel. A connection that falls
    /// further behind skips the oldest events.
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            game: GameConfig::default(),
            lobby: LobbyConfig::default(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
            event_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `HOLDOUT_*` environment variables.
    pub fn from_env() -> Result<Self, HoldoutError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HoldoutError> {
        let mut config = Self::default();
        if let Some(addr) = lookup("HOLDOUT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(v) = parse(&lookup, "HOLDOUT_ROUND_SECONDS")? {
            config.game.round_seconds = v;
        }
        if let Some(v) = parse(&lookup, "HOLDOUT_CHOICE_SECONDS")? {
            config.game.choice_seconds = v;
        }
        if let Some(v) = parse(&lookup, "HOLDOUT_STARTING_BALANCE")? {
            config.lobby.starting_balance = v;
        }
        if let Some(v) = parse(&lookup, "HOLDOUT_IDLE_TIMEOUT_SECONDS")? {
            config.idle_timeout = Duration::from_secs(v);
        }
        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, HoldoutError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| HoldoutError::Config(format!("{key}={raw:?} is not a valid number")))
        })
        .transpose()
}
