//! Advisory round count.

/// How many halving rounds it takes to get `players` down to one.
///
/// Shown to clients as `total_rounds`. Votes and eliminations decide when
/// a session actually ends; this number never gates anything.
pub fn estimate_rounds(players: usize) -> u32 {
    if players <= 1 {
        return 1;
    }
    let mut remaining = players;
    let mut rounds = 0;
    while remaining > 1 {
        remaining -= remaining / 2;
        rounds += 1;
    }
    rounds
}
