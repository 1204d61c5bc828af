//! Serialized access to a single-writer engine shared between tasks.

use std::sync::Arc;

use parking_lot::RwLock;

/// Shared handle on an engine (ledger, poll, registry...).
///
/// Every `write` runs as one critical section, so concurrent callers are
/// serialized and readers never observe a half-applied mutation.
#[derive(Debug)]
pub struct SharedState<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> SharedState<T> {
    /// Wrap an engine.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Run a read-only query.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run a mutation under the exclusive lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Recover the engine if this is the last handle.
    pub fn try_unwrap(self) -> Result<T, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl<T> Clone for SharedState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ledger, LedgerConfig};
    use tokenkit_common::AccountId;

    #[test]
    fn test_concurrent_transfers_are_serialized() {
        let issuer = AccountId::from("issuer");
        let ledger = Ledger::new(
            LedgerConfig::default(),
            "Points",
            "PTS",
            issuer.clone(),
            1_000,
        )
        .unwrap();
        let shared = SharedState::new(ledger);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                let issuer = issuer.clone();
                std::thread::spawn(move || {
                    let to = AccountId::new(format!("user-{}", i));
                    for _ in 0..25 {
                        shared.write(|l| l.transfer(&issuer, &to, 1)).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        shared.read(|l| {
            assert_eq!(l.balance_of(&issuer).unwrap(), 800);
            assert!(l.verify_integrity());
        });
        assert!(shared.try_unwrap().is_ok());
    }
}
