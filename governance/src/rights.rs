//! Rights granted to shareholders above a minimum weight.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tokenkit_common::{Result, TokenError};

/// Rights unlocked once a shareholder weighs at least `threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsTier {
    pub threshold: Decimal,
    pub rights: Vec<String>,
}

impl RightsTier {
    pub fn new(threshold: Decimal, rights: &[&str]) -> Self {
        Self {
            threshold,
            rights: rights.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Ordered table of rights tiers, lowest threshold first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsTable {
    tiers: Vec<RightsTier>,
}

impl RightsTable {
    /// Build a table, sorting tiers by threshold.
    pub fn new(mut tiers: Vec<RightsTier>) -> Self {
        tiers.sort_by(|a, b| a.threshold.cmp(&b.threshold));
        Self { tiers }
    }

    /// A table granting nothing.
    pub fn empty() -> Self {
        Self { tiers: Vec::new() }
    }

    /// The classic minority shareholder protections.
    pub fn minority_shareholder() -> Self {
        Self::new(vec![
            RightsTier::new(
                Decimal::new(5, 2),
                &[
                    "apply to court to prevent the conversion of a public company into a private company",
                    "call a general meeting",
                    "require the circulation of a written resolution to shareholders (in private companies)",
                    "require the passing of a resolution at an annual general meeting (AGM) of a public company",
                ],
            ),
            RightsTier::new(
                Decimal::new(10, 2),
                &[
                    "call for a poll vote on a resolution",
                    "prevent a meeting being held on short notice (in private companies)",
                ],
            ),
            RightsTier::new(
                Decimal::new(15, 2),
                &[
                    "apply to the court to cancel a variation of class rights, provided such shareholders did not consent to, or vote in favour of, the variation",
                ],
            ),
            RightsTier::new(
                Decimal::new(25, 2),
                &["prevent the passing of a special resolution"],
            ),
        ])
    }

    pub fn tiers(&self) -> &[RightsTier] {
        &self.tiers
    }

    /// Union of the rights of every tier whose threshold is at most `weight`.
    pub fn rights_for(&self, weight: Decimal) -> Vec<String> {
        self.tiers
            .iter()
            .take_while(|tier| tier.threshold <= weight)
            .flat_map(|tier| tier.rights.iter().cloned())
            .collect()
    }

    /// Validate thresholds.
    pub fn validate(&self) -> Result<()> {
        for tier in &self.tiers {
            if tier.threshold <= Decimal::ZERO || tier.threshold > Decimal::ONE {
                return Err(TokenError::Configuration(format!(
                    "rights threshold {} must be within (0, 1]",
                    tier.threshold
                )));
            }
        }
        Ok(())
    }
}

impl Default for RightsTable {
    fn default() -> Self {
        Self::minority_shareholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rights_accumulate_by_tier() {
        let table = RightsTable::minority_shareholder();
        assert!(table.rights_for(dec!(0.049)).is_empty());
        assert_eq!(table.rights_for(dec!(0.05)).len(), 4);
        assert_eq!(table.rights_for(dec!(0.12)).len(), 6);
        assert_eq!(table.rights_for(dec!(0.25)).len(), 8);
        assert_eq!(table.rights_for(Decimal::ONE).len(), 8);
    }

    #[test]
    fn test_tiers_sorted() {
        let table = RightsTable::new(vec![
            RightsTier::new(dec!(0.5), &["b"]),
            RightsTier::new(dec!(0.1), &["a"]),
        ]);
        assert_eq!(table.rights_for(dec!(0.2)), vec!["a".to_string()]);
        assert!(table.validate().is_ok());

        let bad = RightsTable::new(vec![RightsTier::new(dec!(1.5), &["x"])]);
        assert!(bad.validate().is_err());
    }
}
