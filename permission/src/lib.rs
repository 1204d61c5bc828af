//! Tokenkit Permission
//!
//! Permission tokens dispatched by an authority: reusable passes, returned
//! temporary passes or single-use tickets.

pub mod config;
pub mod token;
pub mod usage;

pub use config::PermissionConfig;
pub use token::PermissionToken;
pub use usage::PermissionUsage;
