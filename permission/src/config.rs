//! Permission token configuration.

use tokenkit_common::{Result, TokenError};
use tokenkit_ledger::LedgerConfig;

use crate::usage::PermissionUsage;

/// Permission token configuration.
#[derive(Debug, Clone)]
pub struct PermissionConfig {
    /// Configuration of the underlying ledger.
    pub ledger: LedgerConfig,
    /// Initial usage policy.
    pub usage: PermissionUsage,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                // No token, no permission, no account.
                zero_means_absent: true,
                decimals: 0,
                ..LedgerConfig::default()
            },
            usage: PermissionUsage::default(),
        }
    }
}

impl PermissionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        let overrides = LedgerConfig::from_env();
        config.ledger.event_capacity = overrides.event_capacity;
        config.ledger.retain_events = overrides.retain_events;

        if let Ok(usage) = std::env::var("TOKENKIT_PERMISSION_USAGE") {
            config.usage = usage.parse()?;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.ledger.validate()?;

        if self.ledger.decimals != 0 {
            return Err(TokenError::Configuration(
                "permissions cannot be divided".to_string(),
            ));
        }

        if !self.ledger.zero_means_absent {
            return Err(TokenError::Configuration(
                "users without permission must not keep an account".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PermissionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.usage, PermissionUsage::Reusable);
    }

    #[test]
    fn test_divisible_permissions_are_invalid() {
        let mut config = PermissionConfig::default();
        config.ledger.decimals = 1;
        assert!(config.validate().is_err());
    }
}
