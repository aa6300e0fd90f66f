//! Random halving of the in-play set.

use holdout_protocol::{PlayerGameStatus, PlayerId, PlayerStatus};
use rand::Rng;
use rand::seq::index;

/// Result of one elimination draw. Both lists keep the input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elimination {
    pub eliminated: Vec<PlayerId>,
    pub remaining: Vec<PlayerId>,
}

/// Pick `floor(k / 2)` of the `k` in-play players, uniformly at random and
/// without replacement.
///
/// With zero or one player nobody is eliminated.
pub fn eliminate<R: Rng + ?Sized>(in_play: &[PlayerId], rng: &mut R) -> Elimination {
    let k = in_play.len();
    if k <= 1 {
        return Elimination {
            eliminated: Vec::new(),
            remaining: in_play.to_vec(),
        };
    }

    let mut chosen = vec![false; k];
    for i in index::sample(rng, k, k / 2) {
        chosen[i] = true;
    }

    let mut eliminated = Vec::with_capacity(k / 2);
    let mut remaining = Vec::with_capacity(k - k / 2);
    for (player, out) in in_play.iter().zip(chosen) {
        if out {
            eliminated.push(*player);
        } else {
            remaining.push(*player);
        }
    }
    Elimination {
        eliminated,
        remaining,
    }
}

/// Mark each eliminated player's status. Terminal statuses are left as they
/// are.
pub fn mark_eliminated(statuses: &mut [PlayerGameStatus], eliminated: &[PlayerId], round: u32) {
    for status in statuses.iter_mut() {
        if status.status == PlayerStatus::Active && eliminated.contains(&status.player_id) {
            status.status = PlayerStatus::Eliminated;
            status.eliminated_in_round = Some(round);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use holdout_protocol::RosterEntry;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn players(n: u64) -> Vec<PlayerId> {
        (1..=n).map(PlayerId).collect()
    }

    #[test]
    fn test_eliminate_removes_half_rounded_down() {
        let mut rng = StdRng::seed_from_u64(7);
        for k in 2..=33u64 {
            let in_play = players(k);
            let result = eliminate(&in_play, &mut rng);
            let k = k as usize;
            assert_eq!(result.eliminated.len(), k / 2, "k = {k}");
            assert_eq!(result.remaining.len(), k - k / 2, "k = {k}");
        }
    }

    #[test]
    fn test_eliminate_partitions_input() {
        let mut rng = StdRng::seed_from_u64(42);
        let in_play = players(9);
        let result = eliminate(&in_play, &mut rng);

        let out: HashSet<_> = result.eliminated.iter().collect();
        let kept: HashSet<_> = result.remaining.iter().collect();
        assert!(out.is_disjoint(&kept));
        assert_eq!(out.len() + kept.len(), in_play.len());
    }

    #[test]
    fn test_eliminate_noop_for_zero_or_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let none = eliminate(&[], &mut rng);
        assert!(none.eliminated.is_empty());
        assert!(none.remaining.is_empty());

        let one = eliminate(&[PlayerId(5)], &mut rng);
        assert!(one.eliminated.is_empty());
        assert_eq!(one.remaining, vec![PlayerId(5)]);
    }

    #[test]
    fn test_eliminate_draws_every_player_eventually() {
        let mut rng = StdRng::seed_from_u64(3);
        let in_play = players(4);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.extend(eliminate(&in_play, &mut rng).eliminated);
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_mark_eliminated_sets_round_and_skips_terminal() {
        let mut statuses: Vec<_> = (1..=3)
            .map(|i| {
                PlayerGameStatus::active(&RosterEntry {
                    player_id: PlayerId(i),
                    nickname: format!("p{i}"),
                })
            })
            .collect();
        statuses[2].status = PlayerStatus::Quit;
        statuses[2].quit_in_round = Some(1);

        mark_eliminated(&mut statuses, &[PlayerId(1), PlayerId(3)], 2);

        assert_eq!(statuses[0].status, PlayerStatus::Eliminated);
        assert_eq!(statuses[0].eliminated_in_round, Some(2));
        assert_eq!(statuses[1].status, PlayerStatus::Active);
        assert_eq!(statuses[2].status, PlayerStatus::Quit);
        assert_eq!(statuses[2].eliminated_in_round, None);
    }
}
