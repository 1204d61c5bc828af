//! Property tests for the supply and allowance invariants.

use proptest::prelude::*;

use tokenkit_common::AccountId;
use tokenkit_ledger::{Ledger, LedgerConfig};

#[derive(Debug, Clone)]
enum Op {
    Transfer { from: usize, to: usize, amount: i64 },
    Mint { to: usize, amount: i64 },
    Burn { from: usize, amount: i64 },
    Approve { owner: usize, spender: usize, amount: i64 },
    UpdateApprove { owner: usize, spender: usize, delta: i64 },
    TransferFrom { spender: usize, owner: usize, to: usize, amount: i64 },
}

const ACCOUNTS: usize = 4;

fn account(index: usize) -> AccountId {
    AccountId::new(format!("acct-{}", index))
}

fn arb_op() -> impl Strategy<Value = Op> {
    let idx = 0..ACCOUNTS;
    prop_oneof![
        (idx.clone(), idx.clone(), -5i64..200)
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        (idx.clone(), 0i64..100).prop_map(|(to, amount)| Op::Mint { to, amount }),
        (idx.clone(), 0i64..150).prop_map(|(from, amount)| Op::Burn { from, amount }),
        (idx.clone(), idx.clone(), 0i64..100).prop_map(|(owner, spender, amount)| Op::Approve {
            owner,
            spender,
            amount,
        }),
        (idx.clone(), idx.clone(), -50i64..50).prop_map(|(owner, spender, delta)| {
            Op::UpdateApprove {
                owner,
                spender,
                delta,
            }
        }),
        (idx.clone(), idx.clone(), idx, 0i64..100).prop_map(|(spender, owner, to, amount)| {
            Op::TransferFrom {
                spender,
                owner,
                to,
                amount,
            }
        }),
    ]
}

fn apply(ledger: &mut Ledger, op: &Op) {
    // Errors are expected for some operations; only the invariants matter.
    let _ = match *op {
        Op::Transfer { from, to, amount } => ledger
            .transfer(&account(from), &account(to), amount)
            .map(|_| ()),
        Op::Mint { to, amount } => ledger.mint(&account(to), amount).map(|_| ()),
        Op::Burn { from, amount } => ledger.burn(&account(from), amount).map(|_| ()),
        Op::Approve {
            owner,
            spender,
            amount,
        } => ledger
            .approve(&account(owner), &account(spender), amount)
            .map(|_| ()),
        Op::UpdateApprove {
            owner,
            spender,
            delta,
        } => ledger
            .update_approve(&account(owner), &account(spender), delta)
            .map(|_| ()),
        Op::TransferFrom { spender, owner, to, amount } => ledger
            .transfer_from(&account(spender), &account(owner), &account(to), amount)
            .map(|_| ()),
    };
}

proptest! {
    #[test]
    fn supply_equals_sum_of_balances(
        zero_means_absent in any::<bool>(),
        ops in prop::collection::vec(arb_op(), 1..64),
    ) {
        let config = LedgerConfig { zero_means_absent, ..LedgerConfig::default() };
        let mut ledger = Ledger::new(config, "Prop", "PRP", account(0), 500).unwrap();

        for op in &ops {
            apply(&mut ledger, op);
            let sum: i64 = ledger.accounts().map(|(_, balance)| balance).sum();
            prop_assert_eq!(sum, ledger.total_supply());
            prop_assert!(ledger.verify_integrity());
        }
    }

    #[test]
    fn allowances_never_negative(ops in prop::collection::vec(arb_op(), 1..64)) {
        let mut ledger =
            Ledger::new(LedgerConfig::default(), "Prop", "PRP", account(0), 500).unwrap();

        for op in &ops {
            apply(&mut ledger, op);
            for owner in 0..ACCOUNTS {
                for spender in 0..ACCOUNTS {
                    prop_assert!(ledger.allowance_of(&account(owner), &account(spender)) >= 0);
                }
            }
        }
    }

    #[test]
    fn failed_transfer_changes_nothing(amount in 501i64..10_000) {
        let mut ledger =
            Ledger::new(LedgerConfig::default(), "Prop", "PRP", account(0), 500).unwrap();
        prop_assert!(!ledger.transfer(&account(0), &account(1), amount).unwrap());
        prop_assert_eq!(ledger.balance_of(&account(0)).unwrap(), 500);
        prop_assert_eq!(ledger.balance_of(&account(1)).unwrap(), 0);
    }
}

#[test]
fn approve_then_transfer_from_moves_exact_amount() {
    let mut ledger = Ledger::new(LedgerConfig::default(), "Prop", "PRP", account(0), 500).unwrap();
    ledger.approve(&account(0), &account(1), 120).unwrap();
    assert!(ledger.transfer_from(&account(1), &account(0), &account(2), 120).unwrap());

    assert_eq!(ledger.allowance_of(&account(0), &account(1)), 0);
    assert_eq!(ledger.balance_of(&account(0)).unwrap(), 380);
    assert_eq!(ledger.balance_of(&account(2)).unwrap(), 120);
}

#[test]
fn events_reach_late_subscriber_through_history() {
    let mut ledger = Ledger::new(LedgerConfig::default(), "Prop", "PRP", account(0), 500).unwrap();
    ledger.transfer(&account(0), &account(1), 5).unwrap();

    let mut rx = ledger.subscribe();
    ledger.transfer(&account(0), &account(2), 6).unwrap();

    let record = tokio_test::block_on(rx.recv()).unwrap();
    assert_eq!(record.sequence, 2);
    assert_eq!(ledger.events().since(0).count(), 2);
}
