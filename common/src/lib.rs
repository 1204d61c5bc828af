//! Tokenkit Common Types
//!
//! This crate contains shared types used across the tokenkit crates,
//! including identifiers, amounts, poll phases, ledger events and the
//! error taxonomy.

pub mod identifiers;
pub mod monetary;
pub mod poll;
pub mod event;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use monetary::*;
pub use poll::*;
pub use event::*;
pub use error::*;
pub use time::*;
