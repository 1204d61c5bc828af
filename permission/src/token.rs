//! Permission token: an authority dispatches passes and checks them on
//! access.

use tracing::{debug, info, instrument, warn};

use tokenkit_common::{
    system_clock, AccountId, Amount, EventRecord, LedgerId, Result, SharedClock, TokenError,
    TokenEvent,
};
use tokenkit_ledger::Ledger;

use crate::config::PermissionConfig;
use crate::usage::PermissionUsage;

/// Unit tokens granting access to a resource.
///
/// The creator is the authority: it holds the undispatched tokens, hands
/// them out, takes them back and decides how they behave when used.
#[derive(Debug)]
pub struct PermissionToken {
    ledger: Ledger,
    usage: PermissionUsage,
    frozen: bool,
}

impl PermissionToken {
    /// Create `supply` permissions held by `authority`.
    pub fn init(
        config: PermissionConfig,
        authority: AccountId,
        name: impl Into<String>,
        symbol: impl Into<String>,
        supply: Amount,
    ) -> Result<Self> {
        Self::with_clock(config, authority, name, symbol, supply, system_clock())
    }

    /// Create permissions stamping events with the given clock.
    pub fn with_clock(
        config: PermissionConfig,
        authority: AccountId,
        name: impl Into<String>,
        symbol: impl Into<String>,
        supply: Amount,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;
        let ledger = Ledger::with_clock(config.ledger, name, symbol, authority, supply, clock)?;

        info!(
            token_id = %ledger.id(),
            supply = ledger.total_supply(),
            usage = %config.usage,
            "Permission token initialized"
        );

        Ok(Self {
            ledger,
            usage: config.usage,
            frozen: false,
        })
    }

    pub fn id(&self) -> LedgerId {
        self.ledger.id()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn authority(&self) -> &AccountId {
        self.ledger.issuer()
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.ledger.balance_of(account).unwrap_or(0)
    }

    pub fn usage(&self) -> PermissionUsage {
        self.usage
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Users holding at least one token.
    pub fn allowed_users_count(&self) -> usize {
        let authority_listed = usize::from(self.ledger.contains(self.authority()));
        self.ledger.holders_count() - authority_listed
    }

    /// Tokens currently in users' hands.
    pub fn allowed_tokens_count(&self) -> Amount {
        self.total_supply() - self.balance_of(self.authority())
    }

    /// Attach a subscriber to the token's event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventRecord> {
        self.ledger.subscribe()
    }

    // Authority actions

    /// Hand `amount` tokens to a user. Authority only.
    #[instrument(skip(self), fields(token_id = %self.id()))]
    pub fn grant(&mut self, actor: &AccountId, user: &AccountId, amount: Amount) -> Result<bool> {
        self.ensure_authority(actor, "grant permissions")?;
        if !self.ledger.transfer(actor, user, amount)? {
            debug!(user = %user, amount, "Grant refused: not enough undispatched tokens");
            return Ok(false);
        }

        info!(user = %user, amount, "Permission granted");
        self.ledger.emit(TokenEvent::PermissionGranted {
            user: user.clone(),
            amount,
        });
        Ok(true)
    }

    /// Take back up to `amount` tokens from a user. Authority only.
    /// Returns the user's remaining balance.
    #[instrument(skip(self), fields(token_id = %self.id()))]
    pub fn revoke(
        &mut self,
        actor: &AccountId,
        user: &AccountId,
        amount: Amount,
    ) -> Result<Amount> {
        self.ensure_authority(actor, "revoke permissions")?;
        if amount < 0 {
            return Err(TokenError::InvalidAmount(amount));
        }

        let amount = amount.min(self.balance_of(user));
        if amount > 0 && self.ledger.transfer(user, actor, amount)? {
            info!(user = %user, amount, "Permission revoked");
            self.ledger.emit(TokenEvent::PermissionRevoked {
                user: user.clone(),
                amount,
            });
        }
        Ok(self.balance_of(user))
    }

    /// Freeze or unfreeze every permission. Returns the previous state.
    #[instrument(skip(self), fields(token_id = %self.id()))]
    pub fn freeze(&mut self, actor: &AccountId, frozen: bool) -> Result<bool> {
        self.ensure_authority(actor, "freeze permissions")?;
        let previous = std::mem::replace(&mut self.frozen, frozen);
        info!(frozen, previous, "Permission freeze updated");
        Ok(previous)
    }

    /// Change what happens to a token when used. Returns the previous policy.
    #[instrument(skip(self), fields(token_id = %self.id()))]
    pub fn set_usage(
        &mut self,
        actor: &AccountId,
        usage: PermissionUsage,
    ) -> Result<PermissionUsage> {
        self.ensure_authority(actor, "change the permission usage")?;
        Ok(std::mem::replace(&mut self.usage, usage))
    }

    /// Create tokens on the authority's account. Returns the new supply.
    pub fn mint(&mut self, actor: &AccountId, amount: Amount) -> Result<Amount> {
        self.ensure_authority(actor, "mint permissions")?;
        self.ledger.mint(actor, amount)
    }

    /// Destroy undispatched tokens. Returns the new supply.
    pub fn burn(&mut self, actor: &AccountId, amount: Amount) -> Result<Amount> {
        self.ensure_authority(actor, "burn permissions")?;
        self.ledger.burn(actor, amount)
    }

    // User actions

    /// Move tokens between users.
    pub fn transfer(&mut self, actor: &AccountId, to: &AccountId, amount: Amount) -> Result<bool> {
        if actor == self.authority() {
            return self.grant(actor, to, amount);
        }
        self.ledger.transfer(actor, to, amount)
    }

    pub fn approve(
        &mut self,
        actor: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<bool> {
        self.ledger.approve(actor, spender, amount)
    }

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

    pub fn transfer_from(
        &mut self,
        actor: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<bool> {
        self.ledger.transfer_from(actor, owner, to, amount)
    }

    /// Grant or deny access to the caller, depending on the tokens it holds.
    ///
    /// A granted access applies the usage policy: the token goes back to the
    /// authority when `Returned`, and is burnt when `Consumed`.
    #[instrument(skip(self), fields(token_id = %self.id()))]
    pub fn require_access(&mut self, actor: &AccountId) -> Result<bool> {
        if let Err(reason) = self.check_access(actor) {
            debug!(user = %actor, reason = %reason, "Access denied");
            self.ledger.emit(TokenEvent::AccessDenied {
                user: actor.clone(),
                reason: reason.to_string(),
            });
            return Ok(false);
        }

        match self.usage {
            PermissionUsage::Reusable => {}
            PermissionUsage::Returned => {
                let authority = self.authority().clone();
                self.ledger.transfer(actor, &authority, 1)?;
            }
            PermissionUsage::Consumed => {
                self.ledger.burn(actor, 1)?;
            }
        }

        debug!(user = %actor, usage = %self.usage, "Access granted");
        self.ledger.emit(TokenEvent::AccessGranted {
            user: actor.clone(),
        });
        Ok(true)
    }

    fn check_access(&self, actor: &AccountId) -> Result<()> {
        if self.frozen {
            return Err(TokenError::AccessFrozen);
        }
        self.ledger.require(actor, 1)
    }

    fn ensure_authority(&self, actor: &AccountId, action: &str) -> Result<()> {
        if actor != self.authority() {
            warn!(actor = %actor, action, "Unauthorized permission action");
            return Err(TokenError::unauthorized(actor, action));
        }
        Ok(())
    }
}
