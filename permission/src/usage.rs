//! What happens to a permission token when it is used.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tokenkit_common::TokenError;

/// Behaviour of a permission token on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionUsage {
    /// Kept by the user until revoked, like a door pass.
    #[default]
    Reusable,
    /// Goes back to the authority once used, for temporary access.
    Returned,
    /// Burnt once used, like a concert ticket.
    Consumed,
}

impl PermissionUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionUsage::Reusable => "reusable",
            PermissionUsage::Returned => "returned",
            PermissionUsage::Consumed => "consumed",
        }
    }
}

impl fmt::Display for PermissionUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionUsage {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reusable" => Ok(PermissionUsage::Reusable),
            "returned" | "ephemeral" => Ok(PermissionUsage::Returned),
            "consumed" => Ok(PermissionUsage::Consumed),
            other => Err(TokenError::Configuration(format!(
                "unknown permission usage: {}",
                other
            ))),
        }
    }
}
