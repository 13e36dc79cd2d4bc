//! Per-customer serialization of reconciliation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use crate::domain::foundation::CustomerId;

/// Registry of async locks keyed by customer.
///
/// Waiters are served in arrival order. Entries nobody holds or waits on are
/// pruned on the next acquisition.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

/// Locks keyed by internal customer id.
pub type CustomerLocks = KeyedLocks<CustomerId>;

/// Locks keyed by billing customer id, held from identity resolution onward.
pub type BillingCustomerLocks = KeyedLocks<String>;

/// Held while a customer's reconciliation runs.
#[derive(Debug)]
pub struct CustomerLockGuard {
    _guard: OwnedMutexGuard<()>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds the key's lock.
    pub async fn acquire(&self, key: &K) -> CustomerLockGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|id, lock| id == key || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        CustomerLockGuard {
            _guard: lock.lock_owned().await,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
