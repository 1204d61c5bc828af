//! Shares registry configuration.

use tokenkit_common::{Result, TokenError};
use tokenkit_ledger::LedgerConfig;

use crate::policy::VoteMode;
use crate::rights::RightsTable;

/// Shares registry configuration.
#[derive(Debug, Clone)]
pub struct GovernanceConfig {
    /// Configuration of the underlying shares ledger.
    pub ledger: LedgerConfig,
    /// Initial weighing policy.
    pub vote_mode: VoteMode,
    /// Rights granted by weight.
    pub rights: RightsTable,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                // Giving up every share means leaving the company.
                zero_means_absent: true,
                decimals: 3,
                ..LedgerConfig::default()
            },
            vote_mode: VoteMode::default(),
            rights: RightsTable::default(),
        }
    }
}

impl GovernanceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.ledger = config.ledger.with_env_overrides();

        if let Ok(mode) = std::env::var("TOKENKIT_VOTE_MODE") {
            config.vote_mode = mode.parse()?;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.ledger.validate()?;
        self.rights.validate()?;

        if !self.ledger.zero_means_absent {
            return Err(TokenError::Configuration(
                "shareholders without shares must leave the registry".to_string(),
            ));
        }

        Ok(())
    }
}
