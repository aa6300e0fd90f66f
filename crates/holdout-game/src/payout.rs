//! Bank distribution.

use holdout_protocol::{Award, PlayerGameStatus, PlayerId, PlayerStatus};
use rand::Rng;
use rand::seq::SliceRandom;

/// Who gets paid and how much, before anything is credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub awards: Vec<Award>,
    /// Base share for each winner. Equal to the bank for a sole winner.
    pub per_winner: u64,
    /// Coins handed out one by one on top of the base share.
    pub remainder: u64,
    pub split: bool,
}

impl Payout {
    /// A settlement with nobody to pay.
    pub fn none() -> Self {
        Self {
            awards: Vec::new(),
            per_winner: 0,
            remainder: 0,
            split: false,
        }
    }

    pub fn is_no_winner(&self) -> bool {
        self.awards.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.awards.iter().map(|a| a.amount).sum()
    }
}

/// The whole bank goes to one player.
pub fn sole_winner(bank: u64, winner: PlayerId) -> Payout {
    Payout {
        awards: vec![Award {
            player_id: winner,
            amount: bank,
        }],
        per_winner: bank,
        remainder: 0,
        split: false,
    }
}

/// Split the bank evenly among `winners`.
///
/// Winners are shuffled and the first `bank % n` of them get one extra
/// coin, so the awards always add up to the bank exactly. An empty winner
/// list or an empty bank is a no-winner settlement.
pub fn split<R: Rng + ?Sized>(bank: u64, winners: &[PlayerId], rng: &mut R) -> Payout {
    if winners.is_empty() || bank == 0 {
        return Payout::none();
    }

    let n = winners.len() as u64;
    let per_winner = bank / n;
    let remainder = bank % n;

    let mut order = winners.to_vec();
    order.shuffle(rng);

    let awards = order
        .into_iter()
        .enumerate()
        .map(|(i, player_id)| Award {
            player_id,
            amount: per_winner + u64::from((i as u64) < remainder),
        })
        .collect();

    Payout {
        awards,
        per_winner,
        remainder,
        split: true,
    }
}

/// Write the payout into the status list: every earning is reset to zero,
/// then each awarded player becomes `winner` with their amount.
pub fn apply(statuses: &mut [PlayerGameStatus], payout: &Payout) {
    for status in statuses.iter_mut() {
        status.total_coins_earned = 0;
        if let Some(award) = payout
            .awards
            .iter()
            .find(|a| a.player_id == status.player_id)
        {
            status.status = PlayerStatus::Winner;
            status.total_coins_earned = award.amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use holdout_protocol::RosterEntry;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn ids(n: u64) -> Vec<PlayerId> {
        (1..=n).map(PlayerId).collect()
    }

    #[test]
    fn test_split_ten_among_three() {
        let mut rng = StdRng::seed_from_u64(11);
        let payout = split(10, &ids(3), &mut rng);

        assert_eq!(payout.per_winner, 3);
        assert_eq!(payout.remainder, 1);
        assert_eq!(payout.total(), 10);

        let mut amounts: Vec<_> = payout.awards.iter().map(|a| a.amount).collect();
        amounts.sort_unstable();
        assert_eq!(amounts, vec![3, 3, 4]);
    }

    #[test]
    fn test_split_always_sums_to_bank() {
        let mut rng = StdRng::seed_from_u64(5);
        for bank in 1..=40 {
            for n in 1..=9 {
                let payout = split(bank, &ids(n), &mut rng);
                assert_eq!(payout.total(), bank, "bank {bank}, winners {n}");
                assert_eq!(payout.awards.len() as u64, n);
            }
        }
    }

    #[test]
    fn test_split_remainder_goes_to_random_winners() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut lucky = std::collections::HashSet::new();
        for _ in 0..100 {
            let payout = split(4, &ids(3), &mut rng);
            let top = payout.awards.iter().find(|a| a.amount == 2);
            if let Some(a) = top {
                lucky.insert(a.player_id);
            }
        }
        assert_eq!(lucky.len(), 3);
    }

    #[test]
    fn test_split_empty_is_no_winner() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(split(10, &[], &mut rng).is_no_winner());
        assert!(split(0, &ids(2), &mut rng).is_no_winner());
    }

    #[test]
    fn test_sole_winner_takes_whole_bank() {
        let payout = sole_winner(8, PlayerId(3));
        assert_eq!(payout.awards.len(), 1);
        assert_eq!(payout.awards[0].amount, 8);
        assert!(!payout.split);
    }

    #[test]
    fn test_apply_resets_non_winner_earnings() {
        let mut statuses: Vec<_> = ids(3)
            .into_iter()
            .map(|player_id| {
                PlayerGameStatus::active(&RosterEntry {
                    player_id,
                    nickname: String::new(),
                })
            })
            .collect();
        statuses[0].total_coins_earned = 99;

        apply(&mut statuses, &sole_winner(5, PlayerId(2)));

        assert_eq!(statuses[0].total_coins_earned, 0);
        assert_eq!(statuses[0].status, PlayerStatus::Active);
        assert_eq!(statuses[1].total_coins_earned, 5);
        assert_eq!(statuses[1].status, PlayerStatus::Winner);
        let sum: u64 = statuses.iter().map(|s| s.total_coins_earned).sum();
        assert_eq!(sum, 5);
    }
}
