//! Account balance table.

use std::collections::BTreeMap;

use tokenkit_common::{checked_add, AccountId, Amount, Result, TokenError};

/// Mapping from account to its non-negative balance.
///
/// With `zero_means_absent`, an account exists only while it holds tokens:
/// a balance reaching zero deletes the entry and a missing entry reads as
/// zero. Without it, entries are only created or removed explicitly (or by
/// receiving tokens) and querying a missing entry is an error.
#[derive(Debug, Clone)]
pub struct BalanceTable {
    balances: BTreeMap<AccountId, Amount>,
    zero_means_absent: bool,
}

impl BalanceTable {
    /// Create an empty table.
    pub fn new(zero_means_absent: bool) -> Self {
        Self {
            balances: BTreeMap::new(),
            zero_means_absent,
        }
    }

    /// Whether a zero balance removes the account.
    pub fn zero_means_absent(&self) -> bool {
        self.zero_means_absent
    }

    /// Check if the account has an entry.
    pub fn contains(&self, account: &AccountId) -> bool {
        self.balances.contains_key(account)
    }

    /// Raw entry lookup.
    pub fn get(&self, account: &AccountId) -> Option<Amount> {
        self.balances.get(account).copied()
    }

    /// Balance of an account, honouring the absence policy.
    pub fn balance(&self, account: &AccountId) -> Result<Amount> {
        match self.balances.get(account) {
            Some(balance) => Ok(*balance),
            None if self.zero_means_absent => Ok(0),
            None => Err(TokenError::UnknownAccount(account.clone())),
        }
    }

    /// Check if account has sufficient funds. Unknown accounts have none.
    pub fn has_sufficient_funds(&self, account: &AccountId, amount: Amount) -> bool {
        match self.balance(account) {
            Ok(balance) => balance >= amount,
            Err(_) => false,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Check if the table has no entry.
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Iterate over entries in account order.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, Amount)> {
        self.balances.iter().map(|(account, balance)| (account, *balance))
    }

    /// Sum of every balance, widened so it cannot overflow.
    pub fn sum(&self) -> i128 {
        self.balances.values().map(|b| i128::from(*b)).sum()
    }

    /// Create an explicit zero entry. Returns false if it already existed.
    pub fn open(&mut self, account: &AccountId) -> bool {
        if self.balances.contains_key(account) {
            return false;
        }
        self.balances.insert(account.clone(), 0);
        true
    }

    /// Remove an empty entry. Returns false if there was none.
    pub fn close(&mut self, account: &AccountId) -> Result<bool> {
        match self.balances.get(account) {
            None => Ok(false),
            Some(0) => {
                self.balances.remove(account);
                Ok(true)
            }
            Some(balance) => Err(TokenError::AccountNotEmpty {
                account: account.clone(),
                balance: *balance,
            }),
        }
    }

    /// Add tokens to an account, creating it if needed.
    pub fn credit(&mut self, account: &AccountId, amount: Amount) -> Result<Amount> {
        let current = self.get(account).unwrap_or(0);
        let updated = checked_add(current, amount)?;
        self.store(account, updated);
        Ok(updated)
    }

    /// Withdraw tokens from an account.
    pub fn debit(&mut self, account: &AccountId, amount: Amount) -> Result<Amount> {
        let available = self.balance(account)?;
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: account.clone(),
                required: amount,
                available,
            });
        }
        let updated = available - amount;
        self.store(account, updated);
        Ok(updated)
    }

    /// Drop every entry matching the predicate, whatever its balance.
    /// Callers are responsible for moving the tokens first.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&AccountId, Amount) -> bool) {
        self.balances.retain(|account, balance| keep(account, *balance));
    }

    fn store(&mut self, account: &AccountId, balance: Amount) {
        if balance == 0 && self.zero_means_absent {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.clone(), balance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    #[test]
    fn test_zero_means_absent_removes_entry() {
        let mut table = BalanceTable::new(true);
        table.credit(&alice(), 10).unwrap();
        assert_eq!(table.debit(&alice(), 10).unwrap(), 0);
        assert!(!table.contains(&alice()));
        assert_eq!(table.balance(&alice()).unwrap(), 0);
    }

    #[test]
    fn test_zero_retained_when_absence_meaningful() {
        let mut table = BalanceTable::new(false);
        assert!(matches!(
            table.balance(&alice()),
            Err(TokenError::UnknownAccount(_))
        ));
        table.credit(&alice(), 5).unwrap();
        table.debit(&alice(), 5).unwrap();
        assert!(table.contains(&alice()));
        assert_eq!(table.balance(&alice()).unwrap(), 0);
    }

    #[test]
    fn test_debit_insufficient() {
        let mut table = BalanceTable::new(true);
        table.credit(&alice(), 3).unwrap();
        let err = table.debit(&alice(), 4).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        assert_eq!(table.balance(&alice()).unwrap(), 3);
    }

    #[test]
    fn test_close_requires_empty_account() {
        let mut table = BalanceTable::new(false);
        assert!(table.open(&alice()));
        assert!(!table.open(&alice()));
        table.credit(&alice(), 1).unwrap();
        assert!(table.close(&alice()).is_err());
        table.debit(&alice(), 1).unwrap();
        assert!(table.close(&alice()).unwrap());
        assert!(!table.close(&alice()).unwrap());
    }
}
