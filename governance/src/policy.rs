//! Shareholder weighing policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tokenkit_common::TokenError;

/// How a shareholder weighs in an assembly vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteMode {
    /// One dollar, one vote: weight follows the share balance.
    #[default]
    DollarWeighted,
    /// One person, one vote: every shareholder weighs the same.
    PersonWeighted,
}

impl VoteMode {
    /// Short name, as accepted by [`VoteMode::from_str`].
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteMode::DollarWeighted => "dollar",
            VoteMode::PersonWeighted => "person",
        }
    }
}

impl fmt::Display for VoteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteMode {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dollar" | "dollar_weighted" | "odov" => Ok(VoteMode::DollarWeighted),
            "person" | "person_weighted" | "opov" => Ok(VoteMode::PersonWeighted),
            other => Err(TokenError::Configuration(format!(
                "unknown vote mode: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vote_mode() {
        assert_eq!("dollar".parse::<VoteMode>().unwrap(), VoteMode::DollarWeighted);
        assert_eq!(" Person ".parse::<VoteMode>().unwrap(), VoteMode::PersonWeighted);
        assert!("robot".parse::<VoteMode>().is_err());
        assert_eq!(VoteMode::default().to_string(), "dollar");
    }
}
