//! Ledger configuration.

use tokenkit_common::{Result, TokenError, MAX_DECIMALS};

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Whether an account whose balance reaches zero stops existing.
    pub zero_means_absent: bool,
    /// Decimals of the token; supplies are given in whole tokens.
    pub decimals: u32,
    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
    /// Keep every emitted event in memory for later queries.
    pub retain_events: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            zero_means_absent: true,
            decimals: 0,
            event_capacity: 1024,
            retain_events: true,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(flag) = env_bool("TOKENKIT_ZERO_MEANS_ABSENT") {
            self.zero_means_absent = flag;
        }

        if let Ok(decimals) = std::env::var("TOKENKIT_DECIMALS") {
            if let Ok(decimals) = decimals.parse() {
                self.decimals = decimals;
            }
        }

        if let Ok(capacity) = std::env::var("TOKENKIT_EVENT_CAPACITY") {
            if let Ok(capacity) = capacity.parse() {
                self.event_capacity = capacity;
            }
        }

        if let Some(flag) = env_bool("TOKENKIT_RETAIN_EVENTS") {
            self.retain_events = flag;
        }

        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.decimals > MAX_DECIMALS {
            return Err(TokenError::Configuration(format!(
                "decimals cannot exceed {}",
                MAX_DECIMALS
            )));
        }

        if self.event_capacity == 0 {
            return Err(TokenError::Configuration(
                "event capacity cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.zero_means_absent);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = LedgerConfig::default();
        config.event_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.decimals = 19;
        assert!(config.validate().is_err());
    }
}
