//! Session orchestration for Holdout.
//!
//! Each session runs as an isolated Tokio task (actor model) that owns its
//! record, player statuses and votes, and drives itself forward on its own
//! round and choice timers:
//!
//! ```text
//! start → round timer → eliminate half → 1 left? settle
//!                                       → choice timer → tally votes
//!                                           → 0 or 1 stayer / majority leave? settle
//!                                           → next round with the stayers
//! ```
//!
//! # Key types
//!
//! - [`GameManager`]: starts and tears down sessions, routes votes
//! - [`SessionHandle`]: send commands to a running session actor
//! - [`RosterProvider`], [`Wallet`], [`EventSink`]: the collaborators a
//!   session reads from, pays into, and reports to
//! - [`GameConfig`]: window lengths, tick period, RNG seed
//!
//! The rules themselves ([`eliminate`], [`resolve`], [`split`],
//! [`after_round`], [`after_vote`]) are pure functions and carry no
//! runtime state.

mod choice;
mod collaborators;
mod config;
mod elimination;
mod error;
mod manager;
mod outcome;
mod payout;
mod rounds;
mod session;

pub use choice::{Resolution, majority_leave, mark_quit, resolve};
pub use collaborators::{EventSink, RosterProvider, Wallet};
pub use config::{GameConfig, SessionPhase};
pub use elimination::{Elimination, eliminate, mark_eliminated};
pub use error::GameError;
pub use manager::GameManager;
pub use outcome::{AfterRound, AfterVote, Settlement, after_round, after_vote};
pub use payout::{Payout, apply as apply_payout, sole_winner, split};
pub use rounds::estimate_rounds;
pub use session::{SessionHandle, SessionSnapshot};
