//! Coin balances.

use std::collections::HashMap;

use holdout_protocol::PlayerId;

use crate::LobbyError;

/// Per-player coin balances. Accounts open lazily with the starting
/// balance.
#[derive(Debug)]
pub struct Ledger {
    starting_balance: u64,
    balances: HashMap<PlayerId, u64>,
}

impl Ledger {
    pub fn new(starting_balance: u64) -> Self {
        Self {
            starting_balance,
            balances: HashMap::new(),
        }
    }

    /// Opens the account if needed and returns its balance.
    pub fn open(&mut self, player: PlayerId) -> u64 {
        *self.balances.entry(player).or_insert(self.starting_balance)
    }

    pub fn balance(&self, player: PlayerId) -> u64 {
        self.balances
            .get(&player)
            .copied()
            .unwrap_or(self.starting_balance)
    }

    /// Adds coins and returns the new balance.
    pub fn credit(&mut self, player: PlayerId, amount: u64) -> u64 {
        let balance = self.balances.entry(player).or_insert(self.starting_balance);
        *balance = balance.saturating_add(amount);
        tracing::debug!(player_id = %player, amount, balance = *balance, "credited");
        *balance
    }

    /// Removes coins and returns the new balance. Never goes negative.
    pub fn debit(&mut self, player: PlayerId, amount: u64) -> Result<u64, LobbyError> {
        let balance = self.balances.entry(player).or_insert(self.starting_balance);
        if *balance < amount {
            return Err(LobbyError::InsufficientFunds {
                player,
                balance: *balance,
                needed: amount,
            });
        }
        *balance -= amount;
        tracing::debug!(player_id = %player, amount, balance = *balance, "debited");
        Ok(*balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_with_starting_balance() {
        let mut ledger = Ledger::new(10);
        assert_eq!(ledger.balance(PlayerId(1)), 10);
        assert_eq!(ledger.open(PlayerId(1)), 10);
    }

    #[test]
    fn test_credit_and_debit() {
        let mut ledger = Ledger::new(10);
        assert_eq!(ledger.credit(PlayerId(1), 5), 15);
        assert_eq!(ledger.debit(PlayerId(1), 15).unwrap(), 0);
        assert_eq!(ledger.balance(PlayerId(1)), 0);
    }

    #[test]
    fn test_debit_beyond_balance_fails_and_keeps_balance() {
        let mut ledger = Ledger::new(1);
        let err = ledger.debit(PlayerId(1), 2).unwrap_err();
        assert!(matches!(
            err,
            LobbyError::InsufficientFunds {
                balance: 1,
                needed: 2,
                ..
            }
        ));
        assert_eq!(ledger.balance(PlayerId(1)), 1);
    }
}
