//! Tokenkit Ledger Engine
//!
//! Account-balance ledger with atomic transfer, mint and burn, delegated
//! allowances and an append-only event log.

pub mod engine;
pub mod balance;
pub mod allowance;
pub mod events;
pub mod config;
pub mod shared;

pub use engine::Ledger;
pub use balance::BalanceTable;
pub use allowance::AllowanceTable;
pub use events::EventLog;
pub use config::LedgerConfig;
pub use shared::SharedState;
