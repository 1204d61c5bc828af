//! Token amounts and token metadata.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TokenError};

/// An amount of tokens, expressed in base units.
///
/// Amounts are signed so that a negative operand can be reported as
/// [`TokenError::InvalidAmount`] instead of being silently wrapped. Balances,
/// allowances and supply never go below zero.
pub type Amount = i64;

/// Largest number of decimals a token may declare.
pub const MAX_DECIMALS: u32 = 18;

/// Reject negative operands.
pub fn ensure_non_negative(amount: Amount) -> Result<()> {
    if amount < 0 {
        return Err(TokenError::InvalidAmount(amount));
    }
    Ok(())
}

/// Checked addition reporting overflow as a token error.
pub fn checked_add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(TokenError::AmountOverflow)
}

/// `numerator / denominator` as an exact decimal; zero when the denominator is.
pub fn ratio(numerator: Amount, denominator: Amount) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(numerator) / Decimal::from(denominator)
}

/// Descriptive attributes of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Friendly name of the token.
    pub name: String,
    /// Currency symbol, usually 3 or 4 characters.
    pub symbol: String,
    /// Number of decimals used to display base-unit amounts.
    pub decimals: u32,
}

impl TokenMetadata {
    /// Create token metadata.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u32) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Number of base units in one whole token.
    pub fn unit(&self) -> Result<Amount> {
        if self.decimals > MAX_DECIMALS {
            return Err(TokenError::Configuration(format!(
                "{} decimals exceeds the maximum of {}",
                self.decimals, MAX_DECIMALS
            )));
        }
        Ok(10_i64.pow(self.decimals))
    }

    /// Convert a count of whole tokens into base units.
    pub fn to_base_units(&self, whole: Amount) -> Result<Amount> {
        ensure_non_negative(whole)?;
        whole
            .checked_mul(self.unit()?)
            .ok_or(TokenError::AmountOverflow)
    }

    /// Render a base-unit amount as a decimal number of tokens.
    pub fn to_display(&self, amount: Amount) -> Decimal {
        Decimal::new(amount, self.decimals.min(MAX_DECIMALS))
    }
}

impl fmt::Display for TokenMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.symbol)
    }
}
