//! Stay/leave vote resolution.

use std::collections::HashMap;

use holdout_protocol::{Choice, PlayerGameStatus, PlayerId, PlayerStatus};

/// How the in-play players voted when a choice window closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Voted `stay`.
    pub stayers: Vec<PlayerId>,
    /// Voted `leave`.
    pub leavers: Vec<PlayerId>,
    /// Did not vote. Counted as neither stayers nor leave votes.
    pub silent: Vec<PlayerId>,
}

impl Resolution {
    pub fn leave_votes(&self) -> usize {
        self.leavers.len()
    }

    /// `leave_votes >= ceil(votes_cast / 2)`. Silent players are not in the
    /// denominator.
    pub fn majority_leave(&self) -> bool {
        majority_leave(self.stayers.len(), self.leavers.len())
    }
}

/// Sort every in-play player by the vote they cast this round.
///
/// `choices` holds this round's votes only. Votes from players outside
/// `in_play` are ignored.
pub fn resolve(in_play: &[PlayerId], choices: &HashMap<PlayerId, Choice>) -> Resolution {
    let mut out = Resolution::default();
    for player in in_play {
        match choices.get(player) {
            Some(Choice::Stay) => out.stayers.push(*player),
            Some(Choice::Leave) => out.leavers.push(*player),
            None => out.silent.push(*player),
        }
    }
    out
}

pub fn majority_leave(stays: usize, leaves: usize) -> bool {
    let cast = stays + leaves;
    cast > 0 && leaves >= cast.div_ceil(2)
}

/// Mark leavers as `quit` in `round`. Terminal statuses are left alone.
pub fn mark_quit(statuses: &mut [PlayerGameStatus], leavers: &[PlayerId], round: u32) {
    for status in statuses.iter_mut() {
        if status.status == PlayerStatus::Active && leavers.contains(&status.player_id) {
            status.status = PlayerStatus::Quit;
            status.quit_in_round = Some(round);
        }
    }
}
