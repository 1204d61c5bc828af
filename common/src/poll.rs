//! Poll lifecycle types shared by the voting engine, events and errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a poll stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    /// The poll has not been stopped.
    NotStopped,
    /// The referee stopped the poll manually.
    Interrupted,
    /// Every voter cast their ballot.
    Completed,
}

impl StopReason {
    /// Check if the poll is stopped.
    pub fn is_stopped(&self) -> bool {
        !matches!(self, StopReason::NotStopped)
    }
}

/// Lifecycle phase of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollPhase {
    /// Roster is open: candidates and voters may be registered.
    NotStarted,
    /// Ballots are distributed and may be cast.
    InProgress,
    /// All ballots were cast.
    Completed,
    /// The referee interrupted the poll.
    Interrupted,
}

impl PollPhase {
    /// Derive the phase from whether the poll began and why it stopped.
    pub fn from_parts(started: bool, stop_reason: StopReason) -> Self {
        match (started, stop_reason) {
            (false, _) => PollPhase::NotStarted,
            (true, StopReason::NotStopped) => PollPhase::InProgress,
            (true, StopReason::Completed) => PollPhase::Completed,
            (true, StopReason::Interrupted) => PollPhase::Interrupted,
        }
    }

    /// Check if this is a terminal phase.
    pub fn is_stopped(&self) -> bool {
        matches!(self, PollPhase::Completed | PollPhase::Interrupted)
    }

    /// Get valid next phases from the current phase.
    pub fn valid_transitions(&self) -> &[PollPhase] {
        match self {
            PollPhase::NotStarted => &[PollPhase::InProgress, PollPhase::NotStarted],
            PollPhase::InProgress => &[PollPhase::Completed, PollPhase::Interrupted],
            PollPhase::Completed => &[PollPhase::NotStarted],
            PollPhase::Interrupted => &[PollPhase::NotStarted],
        }
    }

    /// Check if transition to the given phase is valid.
    pub fn can_transition_to(&self, next: PollPhase) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollPhase::NotStarted => "not started",
            PollPhase::InProgress => "in progress",
            PollPhase::Completed => "completed",
            PollPhase::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_parts() {
        assert_eq!(
            PollPhase::from_parts(false, StopReason::NotStopped),
            PollPhase::NotStarted
        );
        assert_eq!(
            PollPhase::from_parts(true, StopReason::NotStopped),
            PollPhase::InProgress
        );
        assert_eq!(
            PollPhase::from_parts(true, StopReason::Interrupted),
            PollPhase::Interrupted
        );
    }

    #[test]
    fn test_transitions() {
        assert!(PollPhase::NotStarted.can_transition_to(PollPhase::InProgress));
        assert!(PollPhase::InProgress.can_transition_to(PollPhase::Completed));
        assert!(!PollPhase::InProgress.can_transition_to(PollPhase::NotStarted));
        assert!(PollPhase::Interrupted.can_transition_to(PollPhase::NotStarted));
        assert!(!PollPhase::Completed.can_transition_to(PollPhase::InProgress));
    }
}
