//! Delegation map: at most one delegate per shareholder, one hop only.

use std::collections::BTreeMap;

use tokenkit_common::{AccountId, Result, TokenError};

/// Shareholder to delegate mapping.
#[derive(Debug, Clone, Default)]
pub struct DelegationMap {
    delegates: BTreeMap<AccountId, AccountId>,
}

impl DelegationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegate currently holding the shareholder's power.
    pub fn delegate_of(&self, shareholder: &AccountId) -> Option<&AccountId> {
        self.delegates.get(shareholder)
    }

    /// Check if the shareholder gave its power away.
    pub fn is_delegating(&self, shareholder: &AccountId) -> bool {
        self.delegates.contains_key(shareholder)
    }

    /// Shareholders delegating to `delegate`, in account order.
    pub fn delegators_of<'a>(
        &'a self,
        delegate: &'a AccountId,
    ) -> impl Iterator<Item = &'a AccountId> + 'a {
        self.delegates
            .iter()
            .filter(move |(_, d)| *d == delegate)
            .map(|(shareholder, _)| shareholder)
    }

    /// Check if anyone delegates to the account.
    pub fn has_delegators(&self, delegate: &AccountId) -> bool {
        self.delegators_of(delegate).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &AccountId)> {
        self.delegates.iter()
    }

    /// Record a delegation. Returns the previous delegate.
    ///
    /// Rejects self delegation and anything that would make a chain: the
    /// delegate cannot itself be delegating, and a shareholder holding
    /// delegations cannot pass them on.
    pub fn set(
        &mut self,
        shareholder: &AccountId,
        delegate: &AccountId,
    ) -> Result<Option<AccountId>> {
        if !delegate.is_valid() {
            return Err(TokenError::InvalidDelegation(
                "delegate address cannot be blank".to_string(),
            ));
        }
        if shareholder == delegate {
            return Err(TokenError::InvalidDelegation(format!(
                "{} cannot delegate to itself",
                shareholder
            )));
        }
        if self.is_delegating(delegate) {
            return Err(TokenError::InvalidDelegation(format!(
                "{} already delegates its power",
                delegate
            )));
        }
        if self.has_delegators(shareholder) {
            return Err(TokenError::InvalidDelegation(format!(
                "{} holds delegations and cannot pass them on",
                shareholder
            )));
        }

        Ok(self.delegates.insert(shareholder.clone(), delegate.clone()))
    }

    /// Remove a delegation. Returns the previous delegate.
    pub fn remove(&mut self, shareholder: &AccountId) -> Option<AccountId> {
        self.delegates.remove(shareholder)
    }

    /// Drop every delegation from or to `account`. Returns the shareholders
    /// whose delegation was removed, with their former delegate.
    pub fn prune(&mut self, account: &AccountId) -> Vec<(AccountId, AccountId)> {
        let removed: Vec<(AccountId, AccountId)> = self
            .delegates
            .iter()
            .filter(|(shareholder, delegate)| *shareholder == account || *delegate == account)
            .map(|(shareholder, delegate)| (shareholder.clone(), delegate.clone()))
            .collect();

        for (shareholder, _) in &removed {
            self.delegates.remove(shareholder);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> AccountId {
        AccountId::from(name)
    }

    #[test]
    fn test_set_and_replace() {
        let mut map = DelegationMap::new();
        assert_eq!(map.set(&account("a"), &account("b")).unwrap(), None);
        assert_eq!(map.set(&account("a"), &account("c")).unwrap(), Some(account("b")));
        assert_eq!(map.delegate_of(&account("a")), Some(&account("c")));
        assert!(!map.has_delegators(&account("b")));
    }

    #[test]
    fn test_rejects_self_and_chains() {
        let mut map = DelegationMap::new();
        assert!(matches!(
            map.set(&account("a"), &account("a")),
            Err(TokenError::InvalidDelegation(_))
        ));

        map.set(&account("a"), &account("b")).unwrap();
        // b holds a's power: it cannot pass it on.
        assert!(map.set(&account("b"), &account("c")).is_err());
        // a delegates: nobody can delegate to a.
        assert!(map.set(&account("c"), &account("a")).is_err());
        assert!(map.set(&account("c"), &account("")).is_err());
    }

    #[test]
    fn test_prune() {
        let mut map = DelegationMap::new();
        map.set(&account("a"), &account("b")).unwrap();
        map.set(&account("c"), &account("b")).unwrap();
        map.set(&account("d"), &account("e")).unwrap();

        let removed = map.prune(&account("b"));
        assert_eq!(removed.len(), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.delegators_of(&account("e")).count(), 1);
    }
}
