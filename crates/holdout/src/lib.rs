//! # Holdout
//!
//! WebSocket game server for Holdout: players stake a coin to ready up,
//! half of the field is eliminated each round, and after every round the
//! survivors vote to stay for a bigger share or leave and split the bank.
//!
//! The server wires the layers together:
//!
//! ```text
//! holdout-transport (WebSocket text frames)
//!   → holdout-protocol (Envelope<ClientCommand> / Envelope<ServerMessage>)
//!   → holdout-lobby (membership, ready stakes, balances)
//!   → holdout-game (one actor per session, round and choice timers)
//! ```
//!
//! Game events flow back through an [`EventHub`] and reach every
//! connection whose player is in the session's lobby.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use holdout::{HoldoutServer, ServerConfig};
//!
//! # async fn run() -> Result<(), holdout::HoldoutError> {
//! let server = HoldoutServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod hub;
mod server;

pub use config::ServerConfig;
pub use error::HoldoutError;
pub use hub::{EventHub, LobbyEvent};
pub use server::{HoldoutServer, HoldoutServerBuilder};
