//! Poll state: referee, candidate roster and lifecycle timestamps.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tokenkit_common::{AccountId, LedgerId, PollPhase, Result, StopReason, TokenError};

/// Mutable state of a poll, apart from the ballots held by the ledger.
#[derive(Debug, Clone)]
pub struct PollState {
    /// Referee of the poll, fixed at initialization.
    pub referee: AccountId,
    /// Candidates in registration order.
    pub candidates: Vec<AccountId>,
    /// When ballots were distributed.
    pub began_at: Option<DateTime<Utc>>,
    /// When the poll stopped.
    pub ended_at: Option<DateTime<Utc>>,
    /// Why the poll stopped.
    pub stop_reason: StopReason,
}

impl PollState {
    /// Create a fresh, not started poll.
    pub fn new(referee: AccountId) -> Self {
        Self {
            referee,
            candidates: Vec::new(),
            began_at: None,
            ended_at: None,
            stop_reason: StopReason::NotStopped,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> PollPhase {
        PollPhase::from_parts(self.began_at.is_some(), self.stop_reason)
    }

    /// Check if ballots were distributed.
    pub fn is_started(&self) -> bool {
        self.began_at.is_some()
    }

    /// Check if the address is a candidate.
    pub fn is_candidate(&self, account: &AccountId) -> bool {
        self.candidates.contains(account)
    }

    /// Record the beginning of the vote.
    pub fn begin(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.ensure_transition(PollPhase::InProgress, "begin the vote")?;
        self.began_at = Some(at);
        Ok(())
    }

    /// Record the end of the vote.
    pub fn stop(&mut self, reason: StopReason, at: DateTime<Utc>) -> Result<()> {
        let next = PollPhase::from_parts(true, reason);
        self.ensure_transition(next, "stop the vote")?;
        self.stop_reason = reason;
        self.ended_at = Some(at);
        Ok(())
    }

    /// Forget timestamps and candidates.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_transition(PollPhase::NotStarted, "reset the vote")?;
        self.candidates.clear();
        self.began_at = None;
        self.ended_at = None;
        self.stop_reason = StopReason::NotStopped;
        Ok(())
    }

    fn ensure_transition(&self, next: PollPhase, action: &str) -> Result<()> {
        let phase = self.phase();
        if !phase.can_transition_to(next) {
            return Err(TokenError::invalid_poll_state(action, phase));
        }
        Ok(())
    }
}

/// Score of one candidate in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Candidate address.
    pub candidate: AccountId,
    /// Ballots received.
    pub ballots: i64,
    /// Share of all voters.
    pub score: Decimal,
}

/// Snapshot of a poll, suitable for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    /// Poll identity (its ledger's id).
    pub poll_id: LedgerId,
    /// Poll question / token name.
    pub name: String,
    /// Current phase.
    pub phase: PollPhase,
    /// Registered voters.
    pub voters_count: usize,
    /// Candidates ranked by descending score, once stopped.
    pub ranking: Vec<CandidateScore>,
    /// Share of voters who cast their ballot.
    pub participation: Option<Decimal>,
    /// Duration of the vote so far, in milliseconds.
    pub duration_ms: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_phases() {
        let mut state = PollState::new(AccountId::from("referee"));
        assert_eq!(state.phase(), PollPhase::NotStarted);

        state.begin(Utc::now()).unwrap();
        assert_eq!(state.phase(), PollPhase::InProgress);

        state.stop(StopReason::Completed, Utc::now()).unwrap();
        assert_eq!(state.phase(), PollPhase::Completed);

        state.reset().unwrap();
        assert_eq!(state.phase(), PollPhase::NotStarted);
        assert!(state.ended_at.is_none());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut state = PollState::new(AccountId::from("referee"));
        assert!(matches!(
            state.stop(StopReason::Interrupted, Utc::now()),
            Err(TokenError::InvalidPollState { phase: PollPhase::NotStarted, .. })
        ));

        state.begin(Utc::now()).unwrap();
        assert!(matches!(
            state.begin(Utc::now()),
            Err(TokenError::InvalidPollState { phase: PollPhase::InProgress, .. })
        ));
        assert!(state.reset().is_err());
        assert!(state.stop(StopReason::NotStopped, Utc::now()).is_err());

        state.stop(StopReason::Interrupted, Utc::now()).unwrap();
        assert!(state.stop(StopReason::Completed, Utc::now()).is_err());
        assert_eq!(state.phase(), PollPhase::Interrupted);

        // Resetting a fresh poll is allowed.
        state.reset().unwrap();
        state.reset().unwrap();
    }
}
