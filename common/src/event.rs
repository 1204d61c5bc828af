//! Typed records emitted on every ledger, poll, governance and permission
//! state change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, LedgerId};

/// A state change, carrying its operands and resulting totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenEvent {
    /// Tokens moved between two accounts.
    Transferred {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Tokens were created on an account.
    Minted {
        account: AccountId,
        amount: Amount,
        total_supply: Amount,
    },
    /// Tokens were destroyed from an account.
    Burnt {
        account: AccountId,
        amount: Amount,
        total_supply: Amount,
    },
    /// An allowance was set or changed.
    AllowanceChanged {
        owner: AccountId,
        spender: AccountId,
        allowance: Amount,
    },
    /// An account entry was explicitly created.
    AccountOpened { account: AccountId },
    /// An empty account entry was removed.
    AccountClosed { account: AccountId },

    /// A poll distributed its ballots.
    PollStarted {
        voters_count: usize,
        candidates: Vec<AccountId>,
    },
    /// A ballot was put in a candidate's urn.
    BallotCast {
        voter: AccountId,
        candidate: AccountId,
        participation: Decimal,
        remaining_votes: usize,
    },
    /// Every voter made their mind.
    PollCompleted { winner: AccountId, duration_ms: i64 },
    /// The referee stopped the poll.
    PollInterrupted { winner: AccountId, duration_ms: i64 },
    /// The poll was reset and every ballot returned to the referee.
    PollCleared { referee: AccountId },

    /// A shareholder entrusted their voting power to a delegate.
    DelegateSet {
        shareholder: AccountId,
        delegate: AccountId,
        previous: Option<AccountId>,
    },
    /// A shareholder took their voting power back.
    DelegateRemoved {
        shareholder: AccountId,
        previous: AccountId,
    },
    /// The shareholder weighing policy changed.
    VoteModeChanged { mode: String },

    /// The authority handed permission tokens to a user.
    PermissionGranted { user: AccountId, amount: Amount },
    /// The authority took permission tokens back from a user.
    PermissionRevoked { user: AccountId, amount: Amount },
    /// A user was allowed access.
    AccessGranted { user: AccountId },
    /// A user was refused access.
    AccessDenied { user: AccountId, reason: String },
}

impl TokenEvent {
    /// Short name of the event kind, as used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenEvent::Transferred { .. } => "transferred",
            TokenEvent::Minted { .. } => "minted",
            TokenEvent::Burnt { .. } => "burnt",
            TokenEvent::AllowanceChanged { .. } => "allowance_changed",
            TokenEvent::AccountOpened { .. } => "account_opened",
            TokenEvent::AccountClosed { .. } => "account_closed",
            TokenEvent::PollStarted { .. } => "poll_started",
            TokenEvent::BallotCast { .. } => "ballot_cast",
            TokenEvent::PollCompleted { .. } => "poll_completed",
            TokenEvent::PollInterrupted { .. } => "poll_interrupted",
            TokenEvent::PollCleared { .. } => "poll_cleared",
            TokenEvent::DelegateSet { .. } => "delegate_set",
            TokenEvent::DelegateRemoved { .. } => "delegate_removed",
            TokenEvent::VoteModeChanged { .. } => "vote_mode_changed",
            TokenEvent::PermissionGranted { .. } => "permission_granted",
            TokenEvent::PermissionRevoked { .. } => "permission_revoked",
            TokenEvent::AccessGranted { .. } => "access_granted",
            TokenEvent::AccessDenied { .. } => "access_denied",
        }
    }
}

/// An event as stored in the append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in emission order, starting at 1.
    pub sequence: u64,
    /// Ledger the event belongs to.
    pub ledger_id: LedgerId,
    /// The event payload.
    pub event: TokenEvent,
    /// When the event was appended.
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = TokenEvent::Transferred {
            from: AccountId::from("alice"),
            to: AccountId::from("bob"),
            amount: 30,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "transferred");
        assert_eq!(json["amount"], 30);
        assert_eq!(event.kind(), "transferred");
    }
}
