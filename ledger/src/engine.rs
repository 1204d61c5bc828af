//! Core ledger engine implementation.

use tracing::{debug, info, instrument, warn};

use tokenkit_common::{
    checked_add, ensure_non_negative, system_clock, AccountId, Amount, EventRecord, LedgerId,
    Result, SharedClock, TokenError, TokenEvent, TokenMetadata,
};

use crate::allowance::AllowanceTable;
use crate::balance::BalanceTable;
use crate::config::LedgerConfig;
use crate::events::EventLog;

/// A single token instance: balances, total supply, allowances and the log
/// of every state change.
///
/// Every mutating operation checks its preconditions before touching any
/// table, so a failed call leaves the ledger unchanged. The sum of all
/// balances always equals [`Ledger::total_supply`].
#[derive(Debug)]
pub struct Ledger {
    id: LedgerId,
    metadata: TokenMetadata,
    issuer: AccountId,
    config: LedgerConfig,
    balances: BalanceTable,
    allowances: AllowanceTable,
    total_supply: Amount,
    events: EventLog,
}

impl Ledger {
    /// Create a ledger whose issuer holds `supply` whole tokens.
    pub fn new(
        config: LedgerConfig,
        name: impl Into<String>,
        symbol: impl Into<String>,
        issuer: AccountId,
        supply: Amount,
    ) -> Result<Self> {
        Self::with_clock(config, name, symbol, issuer, supply, system_clock())
    }

    /// Create a ledger stamping its events with the given clock.
    #[instrument(skip_all, fields(issuer = %issuer, supply = supply))]
    pub fn with_clock(
        config: LedgerConfig,
        name: impl Into<String>,
        symbol: impl Into<String>,
        issuer: AccountId,
        supply: Amount,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;
        if !issuer.is_valid() {
            return Err(TokenError::Configuration(
                "issuer address cannot be blank".to_string(),
            ));
        }

        let metadata = TokenMetadata::new(name, symbol, config.decimals);
        let total_supply = metadata.to_base_units(supply)?;
        let id = LedgerId::new();

        let mut balances = BalanceTable::new(config.zero_means_absent);
        if total_supply > 0 || !config.zero_means_absent {
            balances.credit(&issuer, total_supply)?;
        }

        let events = EventLog::new(id, config.event_capacity, config.retain_events, clock);

        info!(
            ledger_id = %id,
            token = %metadata,
            total_supply,
            "Ledger created"
        );

        Ok(Self {
            id,
            metadata,
            issuer,
            config,
            balances,
            allowances: AllowanceTable::new(),
            total_supply,
            events,
        })
    }

    /// Ledger identity.
    pub fn id(&self) -> LedgerId {
        self.id
    }

    /// Token metadata.
    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Account that created the token.
    pub fn issuer(&self) -> &AccountId {
        &self.issuer
    }

    /// Configuration in use.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current total supply.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of an account. Fails with `UnknownAccount` only when absence
    /// is meaningful for this ledger.
    pub fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        self.balances.balance(account)
    }

    /// Allowance of `spender` on `owner`'s account.
    pub fn allowance_of(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances.get(owner, spender)
    }

    /// Check if the account is a recognized participant.
    pub fn contains(&self, account: &AccountId) -> bool {
        self.balances.contains(account)
    }

    /// Number of accounts with an entry.
    pub fn holders_count(&self) -> usize {
        self.balances.len()
    }

    /// Iterate over accounts and balances in account order.
    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, Amount)> {
        self.balances.iter()
    }

    /// Read-only view of the balance table.
    pub fn balances(&self) -> &BalanceTable {
        &self.balances
    }

    /// Read-only view of the allowance table.
    pub fn allowances(&self) -> &AllowanceTable {
        &self.allowances
    }

    /// Assert that `account` holds at least `amount`.
    pub fn require(&self, account: &AccountId, amount: Amount) -> Result<()> {
        ensure_non_negative(amount)?;
        let available = self.balances.balance(account).unwrap_or(0);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: account.clone(),
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// Returns `Ok(false)` without touching anything when `from` cannot
    /// cover the amount (including when it is not a known account).
    #[instrument(skip(self), fields(ledger_id = %self.id))]
    pub fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<bool> {
        if let Err(e) = ensure_non_negative(amount) {
            warn!(error = %e, "Rejected transfer");
            return Err(e);
        }

        if !self.balances.has_sufficient_funds(from, amount) {
            debug!(
                from = %from,
                amount,
                "Transfer refused: insufficient funds"
            );
            return Ok(false);
        }

        if from != to {
            // Both sides are computed before anything is written.
            let credited = self.balances.get(to).unwrap_or(0);
            checked_add(credited, amount)?;
            self.balances.debit(from, amount)?;
            self.balances.credit(to, amount)?;
        }

        self.events.append(TokenEvent::Transferred {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(true)
    }

    /// Create `amount` tokens on `account`. Returns the new total supply.
    #[instrument(skip(self), fields(ledger_id = %self.id))]
    pub fn mint(&mut self, account: &AccountId, amount: Amount) -> Result<Amount> {
        ensure_non_negative(amount)?;
        let total_supply = checked_add(self.total_supply, amount)?;
        self.balances.credit(account, amount)?;
        self.total_supply = total_supply;

        info!(account = %account, amount, total_supply, "Tokens minted");
        self.events.append(TokenEvent::Minted {
            account: account.clone(),
            amount,
            total_supply,
        });
        Ok(total_supply)
    }

    /// Destroy `amount` tokens from `account`. Returns the new total supply.
    #[instrument(skip(self), fields(ledger_id = %self.id))]
    pub fn burn(&mut self, account: &AccountId, amount: Amount) -> Result<Amount> {
        ensure_non_negative(amount)?;
        self.require(account, amount)?;
        self.balances.debit(account, amount)?;
        self.total_supply -= amount;

        info!(
            account = %account,
            amount,
            total_supply = self.total_supply,
            "Tokens burnt"
        );
        self.events.append(TokenEvent::Burnt {
            account: account.clone(),
            amount,
            total_supply: self.total_supply,
        });
        Ok(self.total_supply)
    }

    /// Set the allowance of `spender` on `owner` to exactly `amount`.
    #[instrument(skip(self), fields(ledger_id = %self.id))]
    pub fn approve(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<bool> {
        self.allowances.set(owner, spender, amount)?;
        self.events.append(TokenEvent::AllowanceChanged {
            owner: owner.clone(),
            spender: spender.clone(),
            allowance: amount,
        });
        Ok(true)
    }

    /// Add a signed `delta` to the allowance. Returns the new allowance.
    #[instrument(skip(self), fields(ledger_id = %self.id))]
    pub fn update_approve(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        delta: Amount,
    ) -> Result<Amount> {
        let allowance = self.allowances.update(owner, spender, delta)?;
        self.events.append(TokenEvent::AllowanceChanged {
            owner: owner.clone(),
            spender: spender.clone(),
            allowance,
        });
        Ok(allowance)
    }

    /// Move `amount` from `owner` to `to` on behalf of `spender`.
    ///
    /// Exceeding the allowance is an error. An owner short of funds yields
    /// `Ok(false)` and leaves the allowance untouched.
    #[instrument(skip(self), fields(ledger_id = %self.id))]
    pub fn transfer_from(
        &mut self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<bool> {
        ensure_non_negative(amount)?;
        if let Err(e) = self.allowances.require(owner, spender, amount) {
            warn!(error = %e, "Rejected delegated transfer");
            return Err(e);
        }

        if !self.transfer(owner, to, amount)? {
            return Ok(false);
        }

        let allowance = self.allowances.consume(owner, spender, amount)?;
        self.events.append(TokenEvent::AllowanceChanged {
            owner: owner.clone(),
            spender: spender.clone(),
            allowance,
        });
        Ok(true)
    }

    /// Register an account with an explicit zero balance.
    pub fn open_account(&mut self, account: &AccountId) -> Result<bool> {
        if !account.is_valid() {
            return Err(TokenError::UnknownAccount(account.clone()));
        }
        if self.balances.zero_means_absent() {
            return Ok(false);
        }
        let opened = self.balances.open(account);
        if opened {
            self.events.append(TokenEvent::AccountOpened {
                account: account.clone(),
            });
        }
        Ok(opened)
    }

    /// Remove an empty account.
    pub fn close_account(&mut self, account: &AccountId) -> Result<bool> {
        let closed = self.balances.close(account)?;
        if closed {
            self.events.append(TokenEvent::AccountClosed {
                account: account.clone(),
            });
        }
        Ok(closed)
    }

    /// Move every balance held by other accounts back to `target`.
    #[instrument(skip(self), fields(ledger_id = %self.id))]
    pub fn sweep_to(&mut self, target: &AccountId) -> Result<Amount> {
        let holders: Vec<(AccountId, Amount)> = self
            .balances
            .iter()
            .filter(|(account, balance)| *account != target && *balance > 0)
            .map(|(account, balance)| (account.clone(), balance))
            .collect();

        let mut swept = 0;
        for (account, balance) in holders {
            self.balances.debit(&account, balance)?;
            self.balances.credit(target, balance)?;
            swept += balance;
            self.events.append(TokenEvent::Transferred {
                from: account,
                to: target.clone(),
                amount: balance,
            });
        }

        debug!(target = %target, swept, "Balances swept");
        Ok(swept)
    }

    /// Drop every empty account for which `remove` returns true.
    pub fn close_empty_accounts(&mut self, mut remove: impl FnMut(&AccountId) -> bool) -> usize {
        let closed: Vec<AccountId> = self
            .balances
            .iter()
            .filter(|(account, balance)| *balance == 0 && remove(*account))
            .map(|(account, _)| account.clone())
            .collect();

        self.balances
            .retain(|account, _| !closed.contains(account));
        for account in &closed {
            self.events.append(TokenEvent::AccountClosed {
                account: account.clone(),
            });
        }
        closed.len()
    }

    /// Append a domain event to this ledger's log.
    pub fn emit(&mut self, event: TokenEvent) -> u64 {
        self.events.append(event)
    }

    /// Event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Attach a subscriber to the event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Verify ledger integrity (balances add up to supply, nothing negative).
    pub fn verify_integrity(&self) -> bool {
        self.balances.sum() == i128::from(self.total_supply)
            && self.balances.iter().all(|(_, balance)| balance >= 0)
            && self.allowances.is_consistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> AccountId {
        AccountId::from(name)
    }

    fn create_test_ledger(zero_means_absent: bool) -> Ledger {
        let config = LedgerConfig {
            zero_means_absent,
            ..LedgerConfig::default()
        };
        Ledger::new(config, "Test token", "TST", account("A"), 100).unwrap()
    }

    #[test]
    fn test_transfer() {
        let mut ledger = create_test_ledger(true);

        assert!(ledger.transfer(&account("A"), &account("B"), 30).unwrap());

        assert_eq!(ledger.balance_of(&account("A")).unwrap(), 70);
        assert_eq!(ledger.balance_of(&account("B")).unwrap(), 30);
        assert_eq!(ledger.total_supply(), 100);
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_transfer_insufficient_funds_is_noop() {
        let mut ledger = create_test_ledger(true);

        assert!(!ledger.transfer(&account("B"), &account("A"), 1).unwrap());
        assert!(!ledger.transfer(&account("A"), &account("B"), 101).unwrap());

        assert_eq!(ledger.balance_of(&account("A")).unwrap(), 100);
        assert!(!ledger.contains(&account("B")));
    }

    #[test]
    fn test_transfer_negative_amount_is_error() {
        let mut ledger = create_test_ledger(true);
        let err = ledger
            .transfer(&account("A"), &account("B"), -5)
            .unwrap_err();
        assert_eq!(err, TokenError::InvalidAmount(-5));
    }

    #[test]
    fn test_zero_means_absent_after_exhaustion() {
        let mut ledger = create_test_ledger(true);
        ledger.transfer(&account("A"), &account("B"), 100).unwrap();
        assert!(!ledger.contains(&account("A")));

        let mut ledger = create_test_ledger(false);
        ledger.transfer(&account("A"), &account("B"), 100).unwrap();
        assert!(ledger.contains(&account("A")));
        assert_eq!(ledger.balance_of(&account("A")).unwrap(), 0);
        assert!(ledger.balance_of(&account("Z")).is_err());
    }

    #[test]
    fn test_mint_then_burn() {
        let mut ledger = create_test_ledger(true);

        assert_eq!(ledger.mint(&account("A"), 50).unwrap(), 150);
        assert_eq!(ledger.burn(&account("A"), 20).unwrap(), 130);

        assert_eq!(ledger.total_supply(), 130);
        assert_eq!(ledger.balance_of(&account("A")).unwrap(), 130);
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let mut ledger = create_test_ledger(true);
        let err = ledger.burn(&account("A"), 101).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn test_approve_transfer_from_round_trip() {
        let mut ledger = create_test_ledger(true);
        let (owner, spender, to) = (account("A"), account("S"), account("T"));

        ledger.approve(&owner, &spender, 40).unwrap();
        assert!(ledger.transfer_from(&spender, &owner, &to, 40).unwrap());

        assert_eq!(ledger.allowance_of(&owner, &spender), 0);
        assert_eq!(ledger.balance_of(&owner).unwrap(), 60);
        assert_eq!(ledger.balance_of(&to).unwrap(), 40);
    }

    #[test]
    fn test_transfer_from_without_allowance() {
        let mut ledger = create_test_ledger(true);
        let err = ledger
            .transfer_from(&account("S"), &account("A"), &account("T"), 1)
            .unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_ALLOWANCE");
        assert_eq!(ledger.balance_of(&account("A")).unwrap(), 100);
    }

    #[test]
    fn test_transfer_from_owner_short_keeps_allowance() {
        let mut ledger = create_test_ledger(true);
        let (owner, spender) = (account("A"), account("S"));
        ledger.approve(&owner, &spender, 500).unwrap();

        assert!(!ledger
            .transfer_from(&spender, &owner, &account("T"), 200)
            .unwrap());
        assert_eq!(ledger.allowance_of(&owner, &spender), 500);
    }

    #[test]
    fn test_require() {
        let ledger = create_test_ledger(true);
        assert!(ledger.require(&account("A"), 100).is_ok());
        assert!(matches!(
            ledger.require(&account("A"), 101),
            Err(TokenError::InsufficientBalance { available: 100, .. })
        ));
    }

    #[test]
    fn test_events_emitted_in_order() {
        let mut ledger = create_test_ledger(true);
        ledger.transfer(&account("A"), &account("B"), 10).unwrap();
        ledger.mint(&account("A"), 5).unwrap();
        ledger.burn(&account("B"), 10).unwrap();

        let kinds: Vec<&str> = ledger.events().events().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["transferred", "minted", "burnt"]);
    }

    #[test]
    fn test_sweep_to() {
        let mut ledger = create_test_ledger(false);
        ledger.transfer(&account("A"), &account("B"), 10).unwrap();
        ledger.transfer(&account("A"), &account("C"), 15).unwrap();

        assert_eq!(ledger.sweep_to(&account("A")).unwrap(), 25);
        assert_eq!(ledger.balance_of(&account("A")).unwrap(), 100);
        assert_eq!(ledger.balance_of(&account("B")).unwrap(), 0);
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_close_empty_accounts() {
        let mut ledger = create_test_ledger(false);
        ledger.transfer(&account("A"), &account("B"), 10).unwrap();
        ledger.open_account(&account("C")).unwrap();
        ledger.open_account(&account("D")).unwrap();

        // B still holds tokens, so only C is closed.
        let closed = ledger.close_empty_accounts(|a| *a != account("D"));
        assert_eq!(closed, 1);
        assert!(ledger.contains(&account("B")));
        assert!(!ledger.contains(&account("C")));
        assert!(ledger.contains(&account("D")));

        let kinds: Vec<&str> = ledger.events().events().map(|e| e.kind()).collect();
        assert_eq!(kinds.last(), Some(&"account_closed"));
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_decimals_scale_supply() {
        let config = LedgerConfig {
            decimals: 3,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::new(config, "Shares", "SHR", account("A"), 100).unwrap();
        assert_eq!(ledger.total_supply(), 100_000);
        assert_eq!(ledger.metadata().to_display(ledger.total_supply()).to_string(), "100.000");
    }
}
