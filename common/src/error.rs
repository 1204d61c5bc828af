//! Error types for tokenkit operations.

use crate::{AccountId, Amount, PollPhase};
use thiserror::Error;

/// Main error type for tokenkit operations.
///
/// Expected business failures (not enough funds for a plain transfer, no
/// ballot left) are reported as `Ok(false)` by the boolean operations; the
/// variants below are contract violations or hard failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Negative amount supplied where a non-negative one is required.
    #[error("Invalid amount: {0}")]
    InvalidAmount(Amount),

    /// Account does not hold enough tokens.
    #[error("Insufficient balance on {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        required: Amount,
        available: Amount,
    },

    /// Spender is not allowed to move that many tokens.
    #[error("Insufficient allowance for {spender} on {owner}: required {required}, has {allowed}")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        required: Amount,
        allowed: Amount,
    },

    /// Account is not known to the ledger.
    #[error("Unknown account: {0}")]
    UnknownAccount(AccountId),

    /// Caller is not allowed to perform a privileged action.
    #[error("Unauthorized: {actor} cannot {action}")]
    Unauthorized { actor: AccountId, action: String },

    /// Action attempted in the wrong poll phase.
    #[error("Cannot {action} while the poll is {phase}")]
    InvalidPollState { action: String, phase: PollPhase },

    /// Not enough ballots for another voter.
    #[error("Electoral list is full: {voters} voters for a supply of {supply}")]
    RosterFull { voters: usize, supply: Amount },

    /// Address is not a candidate of the poll.
    #[error("Unknown candidate: {0}")]
    UnknownCandidate(AccountId),

    /// Checked arithmetic would overflow.
    #[error("Amount overflow")]
    AmountOverflow,

    /// Account still holds tokens and cannot be closed.
    #[error("Account {account} still holds {balance}")]
    AccountNotEmpty { account: AccountId, balance: Amount },

    /// Address is already registered in the roster.
    #[error("{0} is already registered")]
    DuplicateParticipant(AccountId),

    /// Poll cannot start without voters and candidates.
    #[error("Poll needs at least one voter and one candidate")]
    EmptyRoster,

    /// Delegation request breaks the delegation rules.
    #[error("Invalid delegation: {0}")]
    InvalidDelegation(String),

    /// Permissions are frozen.
    #[error("All permissions are currently frozen")]
    AccessFrozen,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TokenError {
    /// Build an [`TokenError::Unauthorized`] error.
    pub fn unauthorized(actor: &AccountId, action: impl Into<String>) -> Self {
        TokenError::Unauthorized {
            actor: actor.clone(),
            action: action.into(),
        }
    }

    /// Build an [`TokenError::InvalidPollState`] error.
    pub fn invalid_poll_state(action: impl Into<String>, phase: PollPhase) -> Self {
        TokenError::InvalidPollState {
            action: action.into(),
            phase,
        }
    }

    /// Check if the error reports a misuse of the API rather than a state
    /// the caller could not have foreseen.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            TokenError::InvalidAmount(_)
                | TokenError::Unauthorized { .. }
                | TokenError::InvalidPollState { .. }
                | TokenError::UnknownCandidate(_)
                | TokenError::InvalidDelegation(_)
                | TokenError::DuplicateParticipant(_)
                | TokenError::InsufficientAllowance { .. }
        )
    }

    /// Get error code for reports and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            TokenError::InvalidAmount(_) => "INVALID_AMOUNT",
            TokenError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            TokenError::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            TokenError::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            TokenError::Unauthorized { .. } => "UNAUTHORIZED",
            TokenError::InvalidPollState { .. } => "INVALID_POLL_STATE",
            TokenError::RosterFull { .. } => "ROSTER_FULL",
            TokenError::UnknownCandidate(_) => "UNKNOWN_CANDIDATE",
            TokenError::AmountOverflow => "AMOUNT_OVERFLOW",
            TokenError::AccountNotEmpty { .. } => "ACCOUNT_NOT_EMPTY",
            TokenError::DuplicateParticipant(_) => "DUPLICATE_PARTICIPANT",
            TokenError::EmptyRoster => "EMPTY_ROSTER",
            TokenError::InvalidDelegation(_) => "INVALID_DELEGATION",
            TokenError::AccessFrozen => "ACCESS_FROZEN",
            TokenError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for tokenkit operations.
pub type Result<T> = std::result::Result<T, TokenError>;
