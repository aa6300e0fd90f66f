//! What happens after each timed window closes.
//!
//! These functions only decide. The session actor applies the decision,
//! writes statuses, credits wallets and emits events.

use holdout_protocol::PlayerId;

use crate::choice::Resolution;

/// Who the bank goes to when a session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Sole(PlayerId),
    Split(Vec<PlayerId>),
    NoWinner,
}

impl Settlement {
    /// Split among `players`, or no winner if there are none.
    fn split_or_none(players: &[PlayerId]) -> Self {
        if players.is_empty() {
            Self::NoWinner
        } else {
            Self::Split(players.to_vec())
        }
    }
}

/// Decision after a round's elimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterRound {
    Settle(Settlement),
    /// Open a choice window for these players.
    Choice(Vec<PlayerId>),
}

/// Decision after a choice window's votes are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterVote {
    Settle(Settlement),
    /// Start the next round with the stayers.
    Advance(Vec<PlayerId>),
}

/// `before` is the in-play set captured before elimination ran.
pub fn after_round(before: &[PlayerId], remaining: &[PlayerId]) -> AfterRound {
    match remaining {
        [] => AfterRound::Settle(Settlement::split_or_none(before)),
        [only] => AfterRound::Settle(Settlement::Sole(*only)),
        _ => AfterRound::Choice(remaining.to_vec()),
    }
}

/// `in_play` is everyone who was in play when the window opened.
pub fn after_vote(in_play: &[PlayerId], resolution: &Resolution) -> AfterVote {
    match resolution.stayers.as_slice() {
        [] => AfterVote::Settle(Settlement::split_or_none(in_play)),
        [only] => AfterVote::Settle(Settlement::Sole(*only)),
        stayers if resolution.majority_leave() => {
            AfterVote::Settle(Settlement::Split(stayers.to_vec()))
        }
        stayers => AfterVote::Advance(stayers.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::RangeInclusive<u64>) -> Vec<PlayerId> {
        range.map(PlayerId).collect()
    }

    fn resolution(stay: &[u64], leave: &[u64], silent: &[u64]) -> Resolution {
        Resolution {
            stayers: stay.iter().copied().map(PlayerId).collect(),
            leavers: leave.iter().copied().map(PlayerId).collect(),
            silent: silent.iter().copied().map(PlayerId).collect(),
        }
    }

    #[test]
    fn test_after_round_single_survivor_wins() {
        let out = after_round(&ids(1..=2), &[PlayerId(2)]);
        assert_eq!(out, AfterRound::Settle(Settlement::Sole(PlayerId(2))));
    }

    #[test]
    fn test_after_round_no_survivors_splits_pre_elimination_set() {
        let before = ids(1..=3);
        let out = after_round(&before, &[]);
        assert_eq!(out, AfterRound::Settle(Settlement::Split(before)));
    }

    #[test]
    fn test_after_round_nobody_at_all_is_no_winner() {
        assert_eq!(
            after_round(&[], &[]),
            AfterRound::Settle(Settlement::NoWinner)
        );
    }

    #[test]
    fn test_after_round_several_survivors_vote() {
        let out = after_round(&ids(1..=8), &ids(1..=4));
        assert_eq!(out, AfterRound::Choice(ids(1..=4)));
    }

    #[test]
    fn test_after_vote_one_stay_three_leave_settles_immediately() {
        let out = after_vote(&ids(1..=4), &resolution(&[1], &[2, 3, 4], &[]));
        assert_eq!(out, AfterVote::Settle(Settlement::Sole(PlayerId(1))));
    }

    #[test]
    fn test_after_vote_three_stay_one_leave_advances() {
        let out = after_vote(&ids(1..=4), &resolution(&[1, 2, 3], &[4], &[]));
        assert_eq!(out, AfterVote::Advance(ids(1..=3)));
    }

    #[test]
    fn test_after_vote_majority_leave_splits_among_stayers() {
        let out = after_vote(&ids(1..=4), &resolution(&[1, 2], &[3, 4], &[]));
        assert_eq!(out, AfterVote::Settle(Settlement::Split(ids(1..=2))));
    }

    #[test]
    fn test_after_vote_no_stayers_splits_whole_choice_set() {
        let in_play = ids(1..=3);
        let out = after_vote(&in_play, &resolution(&[], &[1, 2], &[3]));
        assert_eq!(out, AfterVote::Settle(Settlement::Split(in_play)));
    }

    #[test]
    fn test_after_vote_silent_players_do_not_advance() {
        // Players 4 and 5 never voted: they are not carried into the next
        // round even though their status stays active.
        let out = after_vote(&ids(1..=5), &resolution(&[1, 2], &[3], &[4, 5]));
        assert_eq!(out, AfterVote::Advance(ids(1..=2)));
    }
}
