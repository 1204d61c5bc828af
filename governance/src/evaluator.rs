//! Read-only derivation of shares, votes, weights and rights.

use rust_decimal::Decimal;

use tokenkit_common::{ratio, AccountId, Amount, Result, TokenError};
use tokenkit_ledger::Ledger;

use crate::delegation::DelegationMap;
use crate::policy::VoteMode;
use crate::rights::RightsTable;

/// Weighs shareholders from a ledger and a delegation map without mutating
/// either.
///
/// A shareholder who delegates has no effective power: all of it flows to
/// its delegate. Delegations are one hop deep, so effective counts never
/// need a transitive walk.
#[derive(Debug, Clone, Copy)]
pub struct WeightedRightsEvaluator<'a> {
    ledger: &'a Ledger,
    delegations: &'a DelegationMap,
    mode: VoteMode,
    rights: &'a RightsTable,
}

impl<'a> WeightedRightsEvaluator<'a> {
    pub fn new(
        ledger: &'a Ledger,
        delegations: &'a DelegationMap,
        mode: VoteMode,
        rights: &'a RightsTable,
    ) -> Self {
        Self {
            ledger,
            delegations,
            mode,
            rights,
        }
    }

    pub fn mode(&self) -> VoteMode {
        self.mode
    }

    // Shares

    /// The shareholder's own balance.
    pub fn organic_shares(&self, shareholder: &AccountId) -> Result<Amount> {
        self.ensure_shareholder(shareholder)?;
        self.ledger.balance_of(shareholder)
    }

    /// Sum of the balances of everyone delegating to the shareholder.
    pub fn delegated_shares(&self, shareholder: &AccountId) -> Result<Amount> {
        self.ensure_shareholder(shareholder)?;
        self.sum_delegators(shareholder, |d| self.organic_shares(d))
    }

    /// Organic plus delegated shares, or zero when delegating.
    pub fn effective_shares(&self, shareholder: &AccountId) -> Result<Amount> {
        self.ensure_shareholder(shareholder)?;
        if self.delegations.is_delegating(shareholder) {
            return Ok(0);
        }
        Ok(self.organic_shares(shareholder)? + self.delegated_shares(shareholder)?)
    }

    // Votes

    /// Votes cast in an assembly: the supply when dollar weighted, the
    /// number of shareholders when person weighted.
    pub fn total_votes(&self) -> Amount {
        match self.mode {
            VoteMode::DollarWeighted => self.ledger.total_supply(),
            VoteMode::PersonWeighted => self.ledger.holders_count() as Amount,
        }
    }

    /// Votes the shareholder holds on its own.
    pub fn organic_votes(&self, shareholder: &AccountId) -> Result<Amount> {
        match self.mode {
            VoteMode::DollarWeighted => self.organic_shares(shareholder),
            VoteMode::PersonWeighted => {
                self.ensure_shareholder(shareholder)?;
                Ok(1)
            }
        }
    }

    /// Votes entrusted to the shareholder by its delegators.
    pub fn delegated_votes(&self, shareholder: &AccountId) -> Result<Amount> {
        self.ensure_shareholder(shareholder)?;
        self.sum_delegators(shareholder, |d| self.organic_votes(d))
    }

    /// Organic plus delegated votes, or zero when delegating.
    pub fn effective_votes(&self, shareholder: &AccountId) -> Result<Amount> {
        self.ensure_shareholder(shareholder)?;
        if self.delegations.is_delegating(shareholder) {
            return Ok(0);
        }
        Ok(self.organic_votes(shareholder)? + self.delegated_votes(shareholder)?)
    }

    // Weights

    pub fn organic_weight(&self, shareholder: &AccountId) -> Result<Decimal> {
        Ok(ratio(self.organic_votes(shareholder)?, self.total_votes()))
    }

    pub fn delegated_weight(&self, shareholder: &AccountId) -> Result<Decimal> {
        Ok(ratio(self.delegated_votes(shareholder)?, self.total_votes()))
    }

    /// Effective share of all votes.
    pub fn weight(&self, shareholder: &AccountId) -> Result<Decimal> {
        Ok(ratio(self.effective_votes(shareholder)?, self.total_votes()))
    }

    /// Strictly more than half of the effective votes.
    pub fn is_majority(&self, shareholder: &AccountId) -> Result<bool> {
        Ok(self.weight(shareholder)? > Decimal::new(5, 1))
    }

    /// Strictly more than half of the votes, delegation ignored.
    pub fn is_organic_majority(&self, shareholder: &AccountId) -> Result<bool> {
        Ok(self.organic_weight(shareholder)? > Decimal::new(5, 1))
    }

    // Rights

    /// Rights the shareholder holds, delegation included.
    pub fn rights(&self, shareholder: &AccountId) -> Result<Vec<String>> {
        Ok(self.rights.rights_for(self.weight(shareholder)?))
    }

    /// Rights the shareholder holds on its own.
    pub fn organic_rights(&self, shareholder: &AccountId) -> Result<Vec<String>> {
        Ok(self.rights.rights_for(self.organic_weight(shareholder)?))
    }

    fn sum_delegators(
        &self,
        delegate: &AccountId,
        count: impl Fn(&AccountId) -> Result<Amount>,
    ) -> Result<Amount> {
        let mut total: Amount = 0;
        for delegator in self.delegations.delegators_of(delegate) {
            total = total
                .checked_add(count(delegator)?)
                .ok_or(TokenError::AmountOverflow)?;
        }
        Ok(total)
    }

    fn ensure_shareholder(&self, account: &AccountId) -> Result<()> {
        if !self.ledger.contains(account) {
            return Err(TokenError::UnknownAccount(account.clone()));
        }
        Ok(())
    }
}
