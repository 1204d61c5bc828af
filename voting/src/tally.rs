//! Scores and ranking of a stopped poll.

use rust_decimal::Decimal;

use tokenkit_common::{ratio, AccountId, Amount};

/// Ballots received by each candidate, in registration order.
#[derive(Debug, Clone)]
pub struct Tally {
    counts: Vec<(AccountId, Amount)>,
    voters: usize,
}

impl Tally {
    /// Build a tally from per-candidate ballot counts.
    pub fn new(counts: Vec<(AccountId, Amount)>, voters: usize) -> Self {
        Self { counts, voters }
    }

    /// Ballots received by a candidate, if it is one.
    pub fn ballots(&self, candidate: &AccountId) -> Option<Amount> {
        self.counts
            .iter()
            .find(|(c, _)| c == candidate)
            .map(|(_, n)| *n)
    }

    /// Share of all voters who chose the candidate.
    pub fn score(&self, candidate: &AccountId) -> Option<Decimal> {
        let voters = Amount::try_from(self.voters).unwrap_or(Amount::MAX);
        self.ballots(candidate).map(|n| ratio(n, voters))
    }

    /// Candidates by descending score. Equal scores keep registration order.
    pub fn ranking(&self) -> Vec<(AccountId, Amount)> {
        let mut ranked = self.counts.clone();
        // `sort_by` is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// First candidate of the ranking.
    pub fn winner(&self) -> Option<AccountId> {
        self.ranking().into_iter().next().map(|(c, _)| c)
    }

    /// Ballots cast so far.
    pub fn cast(&self) -> Amount {
        self.counts.iter().map(|(_, n)| *n).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tally(counts: &[(&str, Amount)], voters: usize) -> Tally {
        Tally::new(
            counts
                .iter()
                .map(|(c, n)| (AccountId::from(*c), *n))
                .collect(),
            voters,
        )
    }

    #[test]
    fn test_scores() {
        let t = tally(&[("x", 3), ("y", 1)], 8);
        assert_eq!(t.score(&AccountId::from("x")), Some(dec!(0.375)));
        assert_eq!(t.score(&AccountId::from("z")), None);
        assert_eq!(t.cast(), 4);
    }

    #[test]
    fn test_ranking_ties_keep_registration_order() {
        let t = tally(&[("first", 2), ("second", 5), ("third", 2), ("fourth", 5)], 14);
        let order: Vec<String> = t
            .ranking()
            .into_iter()
            .map(|(c, _)| c.to_string())
            .collect();
        assert_eq!(order, vec!["second", "fourth", "first", "third"]);
        assert_eq!(t.winner(), Some(AccountId::from("second")));
    }
}
