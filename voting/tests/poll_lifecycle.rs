//! End-to-end poll runs and lifecycle properties.

use proptest::prelude::*;
use rust_decimal_macros::dec;

use tokenkit_common::{AccountId, PollPhase, TokenError};
use tokenkit_voting::{PollConfig, VotingEngine};

fn account(name: &str) -> AccountId {
    AccountId::from(name)
}

fn voter(i: usize) -> AccountId {
    AccountId::new(format!("voter-{i}"))
}

fn setup(voters: usize, candidates: &[&str], supply: i64) -> VotingEngine {
    let referee = account("referee");
    let mut poll =
        VotingEngine::init(PollConfig::default(), referee.clone(), supply, "Lunch", "LNC").unwrap();
    for c in candidates {
        poll.add_candidate(&referee, &account(c)).unwrap();
    }
    for i in 0..voters {
        poll.register_voter(&referee, &voter(i)).unwrap();
    }
    poll
}

#[test]
fn test_ten_voters_complete_poll() {
    let referee = account("referee");
    let mut poll = setup(10, &["pizza", "sushi"], 10);
    poll.start(&referee).unwrap();

    for i in 0..6 {
        assert!(poll.vote(&voter(i), &account("sushi")).unwrap());
    }
    for i in 6..10 {
        assert!(poll.vote(&voter(i), &account("pizza")).unwrap());
    }

    assert_eq!(poll.phase(), PollPhase::Completed);
    assert_eq!(poll.get_winner().unwrap(), account("sushi"));
    assert_eq!(poll.get_score(&account("sushi")).unwrap(), dec!(0.6));
    assert_eq!(poll.get_ranking().unwrap(), vec![account("sushi"), account("pizza")]);
    assert_eq!(poll.get_remaining_votes().unwrap(), 0);
}

#[test]
fn test_interrupted_tie_keeps_registration_order() {
    let referee = account("referee");
    let mut poll = setup(4, &["red", "blue", "green"], 4);
    poll.start(&referee).unwrap();

    poll.vote(&voter(0), &account("green")).unwrap();
    poll.vote(&voter(1), &account("blue")).unwrap();

    assert_eq!(poll.interrupt(&referee).unwrap(), account("blue"));
    assert_eq!(
        poll.get_ranking().unwrap(),
        vec![account("blue"), account("green"), account("red")]
    );
    assert_eq!(poll.get_participation().unwrap(), dec!(0.5));
}

#[test]
fn test_poll_can_be_rerun_after_clear() {
    let referee = account("referee");
    let mut poll = setup(3, &["yes", "no"], 5);
    poll.start(&referee).unwrap();
    for i in 0..3 {
        poll.vote(&voter(i), &account("no")).unwrap();
    }
    assert_eq!(poll.get_winner().unwrap(), account("no"));

    poll.clear(&referee).unwrap();
    assert!(matches!(poll.get_winner(), Err(TokenError::InvalidPollState { .. })));

    poll.add_candidate(&referee, &account("maybe")).unwrap();
    poll.start(&referee).unwrap();
    for i in 0..3 {
        poll.vote(&voter(i), &account("maybe")).unwrap();
    }
    assert_eq!(poll.get_winner().unwrap(), account("maybe"));
    assert_eq!(poll.balance_of(&referee).unwrap(), 2);
}

#[tokio::test]
async fn test_subscriber_sees_ballots() {
    let referee = account("referee");
    let mut poll = setup(2, &["a", "b"], 2);
    let mut rx = poll.subscribe();

    poll.start(&referee).unwrap();
    poll.vote(&voter(0), &account("a")).unwrap();
    poll.vote(&voter(1), &account("a")).unwrap();

    let mut kinds = Vec::new();
    while let Ok(record) = rx.try_recv() {
        kinds.push(record.event.kind());
    }
    assert_eq!(kinds.iter().filter(|k| **k == "ballot_cast").count(), 2);
    assert_eq!(kinds.last(), Some(&"poll_completed"));
}

proptest! {
    #[test]
    fn clear_is_idempotent(
        choices in prop::collection::vec(0usize..3, 1..8),
        interrupt in any::<bool>(),
    ) {
        let referee = account("referee");
        let candidates = ["x", "y", "z"];
        let mut poll = setup(choices.len(), &candidates, 10);
        poll.start(&referee).unwrap();

        for (i, choice) in choices.iter().enumerate() {
            if interrupt && i == choices.len() - 1 {
                break;
            }
            poll.vote(&voter(i), &account(candidates[*choice])).unwrap();
        }
        if poll.is_vote_in_progress() {
            poll.interrupt(&referee).unwrap();
        }

        poll.clear(&referee).unwrap();
        let voters_after_first = poll.voters();
        let referee_balance = poll.balance_of(&referee).unwrap();

        poll.clear(&referee).unwrap();
        prop_assert_eq!(poll.voters(), voters_after_first);
        prop_assert_eq!(poll.balance_of(&referee).unwrap(), referee_balance);
        prop_assert_eq!(referee_balance, poll.total_supply());
        prop_assert_eq!(poll.phase(), PollPhase::NotStarted);
        prop_assert_eq!(poll.candidates_count(), 0);
        prop_assert!(poll.ledger().verify_integrity());
    }

    #[test]
    fn ballots_are_conserved(choices in prop::collection::vec(0usize..2, 1..10)) {
        let referee = account("referee");
        let mut poll = setup(choices.len(), &["left", "right"], 12);
        poll.start(&referee).unwrap();

        for (i, choice) in choices.iter().enumerate() {
            let candidate = if *choice == 0 { "left" } else { "right" };
            prop_assert!(poll.vote(&voter(i), &account(candidate)).unwrap());
            prop_assert_eq!(poll.get_remaining_votes().unwrap(), choices.len() - i - 1);
        }

        prop_assert_eq!(poll.phase(), PollPhase::Completed);
        let total = poll.balance_of(&account("left")).unwrap()
            + poll.balance_of(&account("right")).unwrap();
        prop_assert_eq!(total as usize, choices.len());
        prop_assert!(poll.ledger().verify_integrity());
    }
}
