//! Tokenkit Voting
//!
//! Polls whose ballots are unit tokens: the referee registers candidates and
//! voters, starting the poll hands one ballot to every voter, and casting a
//! vote moves that ballot to a candidate.

pub mod config;
pub mod engine;
pub mod poll;
pub mod tally;

pub use config::PollConfig;
pub use engine::VotingEngine;
pub use poll::{CandidateScore, PollState, PollSummary};
pub use tally::Tally;
