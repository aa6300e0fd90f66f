//! Lobby membership and coin balances for Holdout.
//!
//! The game layer only ever reads a lobby's roster and credits winners.
//! This crate owns the other side: who joined which lobby in which role,
//! who is ready, and how many coins each player holds.
//!
//! ```text
//! Server (above)  ← joins, leaves, ready flags, balance queries
//!     ↕
//! Lobby layer (this crate)  ← SharedLobbies implements RosterProvider + Wallet
//!     ↕
//! Game layer  ← reads ready list and roster, credits winnings
//! ```
//!
//! Readying up costs a one-coin stake which is refunded on unready. When a
//! session starts the ready list is read and the stakes committed under the
//! same lock: the flags are cleared and the coins stay in the bank.

mod error;
mod ledger;
mod registry;
mod service;
mod shared;

pub use error::LobbyError;
pub use ledger::Ledger;
pub use registry::{Departure, LobbyRegistry, Member};
pub use service::{LobbyConfig, LobbyService, READY_STAKE};
pub use shared::SharedLobbies;
