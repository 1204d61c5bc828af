//! Tokenkit Governance
//!
//! Shares registry with one-hop voting delegation, dollar- or
//! person-weighted assembly policy and minority shareholder rights.

pub mod config;
pub mod delegation;
pub mod evaluator;
pub mod policy;
pub mod registry;
pub mod rights;

pub use config::GovernanceConfig;
pub use delegation::DelegationMap;
pub use evaluator::WeightedRightsEvaluator;
pub use policy::VoteMode;
pub use registry::ShareRegistry;
pub use rights::{RightsTable, RightsTier};
