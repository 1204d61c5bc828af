//! Delegated spending permissions (owner -> spender -> amount).

use std::collections::BTreeMap;

use tokenkit_common::{checked_add, ensure_non_negative, AccountId, Amount, Result, TokenError};

/// Allowance table. Allowances are never negative.
#[derive(Debug, Clone, Default)]
pub struct AllowanceTable {
    allowances: BTreeMap<(AccountId, AccountId), Amount>,
}

impl AllowanceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount `spender` may still move from `owner`'s account.
    pub fn get(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Overwrite the allowance.
    pub fn set(&mut self, owner: &AccountId, spender: &AccountId, amount: Amount) -> Result<()> {
        ensure_non_negative(amount)?;
        self.allowances
            .insert((owner.clone(), spender.clone()), amount);
        Ok(())
    }

    /// Apply a signed delta and return the new allowance.
    pub fn update(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        delta: Amount,
    ) -> Result<Amount> {
        let current = self.get(owner, spender);
        let updated = checked_add(current, delta)?;
        if updated < 0 {
            return Err(TokenError::InsufficientAllowance {
                owner: owner.clone(),
                spender: spender.clone(),
                required: -delta,
                allowed: current,
            });
        }
        self.allowances
            .insert((owner.clone(), spender.clone()), updated);
        Ok(updated)
    }

    /// Fail unless `spender` may move `amount` from `owner`.
    pub fn require(&self, owner: &AccountId, spender: &AccountId, amount: Amount) -> Result<()> {
        let allowed = self.get(owner, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: owner.clone(),
                spender: spender.clone(),
                required: amount,
                allowed,
            });
        }
        Ok(())
    }

    /// Decrement the allowance after a delegated transfer.
    pub fn consume(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<Amount> {
        self.require(owner, spender, amount)?;
        self.update(owner, spender, -amount)
    }

    /// Every spender allowed on `owner`'s account.
    pub fn spenders_of(&self, owner: &AccountId) -> Vec<(AccountId, Amount)> {
        self.allowances
            .iter()
            .filter(|((o, _), _)| o == owner)
            .map(|((_, spender), amount)| (spender.clone(), *amount))
            .collect()
    }

    /// Check that no allowance is negative.
    pub fn is_consistent(&self) -> bool {
        self.allowances.values().all(|amount| *amount >= 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites() {
        let mut table = AllowanceTable::new();
        let (owner, spender) = (AccountId::from("o"), AccountId::from("s"));
        table.set(&owner, &spender, 10).unwrap();
        table.set(&owner, &spender, 4).unwrap();
        assert_eq!(table.get(&owner, &spender), 4);
        assert!(table.set(&owner, &spender, -1).is_err());
    }

    #[test]
    fn test_update_cannot_go_negative() {
        let mut table = AllowanceTable::new();
        let (owner, spender) = (AccountId::from("o"), AccountId::from("s"));
        assert_eq!(table.update(&owner, &spender, 5).unwrap(), 5);
        assert_eq!(table.update(&owner, &spender, -2).unwrap(), 3);
        let err = table.update(&owner, &spender, -4).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_ALLOWANCE");
        assert_eq!(table.get(&owner, &spender), 3);
    }

    #[test]
    fn test_consume() {
        let mut table = AllowanceTable::new();
        let (owner, spender) = (AccountId::from("o"), AccountId::from("s"));
        table.set(&owner, &spender, 2).unwrap();
        assert_eq!(table.consume(&owner, &spender, 2).unwrap(), 0);
        assert!(table.consume(&owner, &spender, 1).is_err());
        assert_eq!(table.spenders_of(&owner), vec![(spender, 0)]);
    }
}
