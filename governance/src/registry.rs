//! Shares registry: a shares ledger, its delegations and assembly policy.

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use tokenkit_common::{
    system_clock, AccountId, Amount, EventRecord, LedgerId, Result, SharedClock, TokenError,
    TokenEvent,
};
use tokenkit_ledger::Ledger;

use crate::config::GovernanceConfig;
use crate::delegation::DelegationMap;
use crate::evaluator::WeightedRightsEvaluator;
use crate::policy::VoteMode;
use crate::rights::RightsTable;

/// Company shares with voting delegation.
///
/// The issuer holds the whole supply at creation and is the authority for
/// the vote mode and the dividend rate. A shareholder whose balance drops
/// to zero leaves the registry, along with any delegation from or to it.
#[derive(Debug)]
pub struct ShareRegistry {
    ledger: Ledger,
    delegations: DelegationMap,
    vote_mode: VoteMode,
    rights: RightsTable,
    dividend: Decimal,
}

impl ShareRegistry {
    /// Create a registry whose issuer holds `supply` whole shares.
    pub fn init(
        config: GovernanceConfig,
        issuer: AccountId,
        name: impl Into<String>,
        symbol: impl Into<String>,
        supply: Amount,
    ) -> Result<Self> {
        Self::with_clock(config, issuer, name, symbol, supply, system_clock())
    }

    /// Create a registry stamping its events with the given clock.
    pub fn with_clock(
        config: GovernanceConfig,
        issuer: AccountId,
        name: impl Into<String>,
        symbol: impl Into<String>,
        supply: Amount,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;
        let ledger = Ledger::with_clock(config.ledger, name, symbol, issuer, supply, clock)?;

        info!(
            registry_id = %ledger.id(),
            total_shares = ledger.total_supply(),
            vote_mode = %config.vote_mode,
            "Share registry initialized"
        );

        Ok(Self {
            ledger,
            delegations: DelegationMap::new(),
            vote_mode: config.vote_mode,
            rights: config.rights,
            dividend: Decimal::ZERO,
        })
    }

    pub fn id(&self) -> LedgerId {
        self.ledger.id()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn issuer(&self) -> &AccountId {
        self.ledger.issuer()
    }

    pub fn delegations(&self) -> &DelegationMap {
        &self.delegations
    }

    pub fn rights_table(&self) -> &RightsTable {
        &self.rights
    }

    /// Attach a subscriber to the registry's event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventRecord> {
        self.ledger.subscribe()
    }

    /// Read-only evaluator over the current state.
    pub fn evaluator(&self) -> WeightedRightsEvaluator<'_> {
        WeightedRightsEvaluator::new(&self.ledger, &self.delegations, self.vote_mode, &self.rights)
    }

    // Shares

    /// Total number of shares, in base units.
    pub fn total_shares(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn total_shareholders(&self) -> usize {
        self.ledger.holders_count()
    }

    pub fn is_shareholder(&self, account: &AccountId) -> bool {
        self.ledger.contains(account)
    }

    pub fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        self.ledger.balance_of(account)
    }

    /// Move shares from the caller to another address.
    #[instrument(skip(self), fields(registry_id = %self.id()))]
    pub fn transfer(&mut self, actor: &AccountId, to: &AccountId, amount: Amount) -> Result<bool> {
        let moved = self.ledger.transfer(actor, to, amount)?;
        if moved {
            self.prune_departed(actor);
        }
        Ok(moved)
    }

    /// Let `spender` move shares on behalf of the caller.
    pub fn approve(
        &mut self,
        actor: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<bool> {
        self.ledger.approve(actor, spender, amount)
    }

    /// Change the allowance of `spender` on the caller's shares.
    pub fn update_approve(
        &mut self,
        actor: &AccountId,
        spender: &AccountId,
        delta: Amount,
    ) -> Result<Amount> {
        self.ledger.update_approve(actor, spender, delta)
    }

    pub fn allowance_of(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.ledger.allowance_of(owner, spender)
    }

    /// Move shares from `owner` to `to` on behalf of the caller.
    #[instrument(skip(self), fields(registry_id = %self.id()))]
    pub fn transfer_from(
        &mut self,
        actor: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<bool> {
        let moved = self.ledger.transfer_from(actor, owner, to, amount)?;
        if moved {
            self.prune_departed(owner);
        }
        Ok(moved)
    }

    // Delegation

    /// Entrust the caller's voting power to another shareholder. Returns the
    /// previous delegate.
    #[instrument(skip(self), fields(registry_id = %self.id()))]
    pub fn set_delegate(
        &mut self,
        actor: &AccountId,
        delegate: &AccountId,
    ) -> Result<Option<AccountId>> {
        if !self.is_shareholder(actor) {
            warn!(actor = %actor, "Delegation refused: not a shareholder");
            return Err(TokenError::UnknownAccount(actor.clone()));
        }
        if delegate.is_valid() && !self.is_shareholder(delegate) {
            return Err(TokenError::InvalidDelegation(format!(
                "{} is not a shareholder",
                delegate
            )));
        }

        let previous = self.delegations.set(actor, delegate)?;
        info!(shareholder = %actor, delegate = %delegate, "Delegate set");
        self.ledger.emit(TokenEvent::DelegateSet {
            shareholder: actor.clone(),
            delegate: delegate.clone(),
            previous: previous.clone(),
        });
        Ok(previous)
    }

    /// Take the caller's voting power back. Returns the previous delegate.
    #[instrument(skip(self), fields(registry_id = %self.id()))]
    pub fn remove_delegate(&mut self, actor: &AccountId) -> Result<Option<AccountId>> {
        let previous = self.delegations.remove(actor);
        if let Some(previous) = &previous {
            info!(shareholder = %actor, previous = %previous, "Delegate removed");
            self.ledger.emit(TokenEvent::DelegateRemoved {
                shareholder: actor.clone(),
                previous: previous.clone(),
            });
        }
        Ok(previous)
    }

    pub fn delegate_of(&self, shareholder: &AccountId) -> Option<&AccountId> {
        self.delegations.delegate_of(shareholder)
    }

    pub fn is_delegating(&self, shareholder: &AccountId) -> bool {
        self.delegations.is_delegating(shareholder)
    }

    /// Shareholders delegating their power to `shareholder`.
    pub fn delegators_of(&self, shareholder: &AccountId) -> Result<Vec<AccountId>> {
        if !self.is_shareholder(shareholder) {
            return Err(TokenError::UnknownAccount(shareholder.clone()));
        }
        Ok(self.delegations.delegators_of(shareholder).cloned().collect())
    }

    // Assembly policy

    pub fn vote_mode(&self) -> VoteMode {
        self.vote_mode
    }

    /// Change how shareholders weigh. Issuer only. Returns the old mode.
    #[instrument(skip(self), fields(registry_id = %self.id()))]
    pub fn set_vote_mode(&mut self, actor: &AccountId, mode: VoteMode) -> Result<VoteMode> {
        self.ensure_issuer(actor, "change the vote mode")?;
        let previous = std::mem::replace(&mut self.vote_mode, mode);
        if previous != mode {
            info!(previous = %previous, mode = %mode, "Vote mode changed");
            self.ledger.emit(TokenEvent::VoteModeChanged {
                mode: mode.to_string(),
            });
        }
        Ok(previous)
    }

    pub fn dividend(&self) -> Decimal {
        self.dividend
    }

    /// Change the dividend rate. Issuer only. Returns the old rate.
    #[instrument(skip(self), fields(registry_id = %self.id()))]
    pub fn set_dividend(&mut self, actor: &AccountId, rate: Decimal) -> Result<Decimal> {
        self.ensure_issuer(actor, "change the dividend")?;
        if rate.is_sign_negative() {
            return Err(TokenError::Configuration(format!(
                "dividend rate cannot be negative: {}",
                rate
            )));
        }
        let previous = std::mem::replace(&mut self.dividend, rate);
        debug!(previous = %previous, rate = %rate, "Dividend changed");
        Ok(previous)
    }

    // Weights and rights

    pub fn get_weight(&self, shareholder: &AccountId) -> Result<Decimal> {
        self.evaluator().weight(shareholder)
    }

    pub fn get_rights(&self, shareholder: &AccountId) -> Result<Vec<String>> {
        self.evaluator().rights(shareholder)
    }

    pub fn is_majority(&self, shareholder: &AccountId) -> Result<bool> {
        self.evaluator().is_majority(shareholder)
    }

    fn prune_departed(&mut self, account: &AccountId) {
        if self.ledger.contains(account) {
            return;
        }
        for (shareholder, previous) in self.delegations.prune(account) {
            debug!(shareholder = %shareholder, previous = %previous, "Delegation pruned");
            self.ledger.emit(TokenEvent::DelegateRemoved {
                shareholder,
                previous,
            });
        }
    }

    fn ensure_issuer(&self, actor: &AccountId, action: &str) -> Result<()> {
        if actor != self.ledger.issuer() {
            warn!(actor = %actor, action, "Unauthorized registry action");
            return Err(TokenError::unauthorized(actor, action));
        }
        Ok(())
    }
}
