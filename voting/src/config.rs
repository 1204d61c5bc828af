//! Poll configuration.

use tokenkit_common::{Result, TokenError};
use tokenkit_ledger::LedgerConfig;

/// Poll configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Configuration of the underlying ballot ledger.
    pub ledger: LedgerConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                // Voters keep their entry after casting their ballot.
                zero_means_absent: false,
                // A ballot cannot be split.
                decimals: 0,
                ..LedgerConfig::default()
            },
        }
    }
}

impl PollConfig {
    /// Load configuration from environment variables. Ballot ledgers keep
    /// their absence policy and decimals whatever the environment says.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let overrides = LedgerConfig::from_env();
        config.ledger.event_capacity = overrides.event_capacity;
        config.ledger.retain_events = overrides.retain_events;
        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.ledger.validate()?;

        if self.ledger.zero_means_absent {
            return Err(TokenError::Configuration(
                "ballot ledgers must keep voters with an empty balance".to_string(),
            ));
        }

        if self.ledger.decimals != 0 {
            return Err(TokenError::Configuration(
                "ballots cannot be split".to_string(),
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
        assert!(PollConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = PollConfig::default();
        config.ledger.zero_means_absent = true;
        assert!(config.validate().is_err());

        let mut config = PollConfig::default();
        config.ledger.decimals = 2;
        assert!(config.validate().is_err());
    }
}
