//! Shared vocabulary for Holdout.
//!
//! This crate defines everything that crosses a crate or network boundary:
//!
//! - **Identity** ([`PlayerId`], [`SessionId`], [`LobbyId`]): newtypes so a
//!   session id can never be passed where a player id is expected.
//! - **Records** ([`GameSession`], [`PlayerGameStatus`], [`PlayerChoice`],
//!   [`GameRound`]): the persisted shape of a game, as the orchestrator
//!   writes it and as clients see it.
//! - **Events** ([`GameEvent`]): the broadcast notifications a session emits
//!   as it moves through its phases.
//! - **Wire** ([`ClientCommand`], [`ServerMessage`], [`Envelope`]) and
//!   **Codec** ([`Codec`], [`JsonCodec`]): how those travel as bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Game (sessions, events)
//! ```

mod codec;
mod error;
mod event;
mod types;
mod wire;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{Award, GameEvent, GameResult};
pub use types::{
    Choice, GameRound, GameSession, LobbyId, PlayerChoice, PlayerGameStatus,
    PlayerId, PlayerStatus, RosterEntry, SessionId, SessionStatus,
};
pub use wire::{
    ClientCommand, Envelope, GameStatusView, LobbyRole, Reply, ServerMessage,
};
