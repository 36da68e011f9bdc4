//! Per-key mutual exclusion for lifecycle operations.
//!
//! Create, update and validate of one `(user, file)` pair must not overlap,
//! nor may two deletes of the same bag.

use std::sync::Arc;

use common::storage::{BagId, FileId};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    File(String, FileId),
    Bag(String, BagId),
}

/// Held for the duration of one lifecycle operation.
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

#[derive(Clone, Default)]
pub struct KeyLocks {
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_file(&self, user_id: &str, file_id: FileId) -> KeyGuard {
        self.acquire(LockKey::File(user_id.to_string(), file_id))
            .await
    }

    pub async fn lock_bag(&self, user_id: &str, bag_id: BagId) -> KeyGuard {
        self.acquire(LockKey::Bag(user_id.to_string(), bag_id)).await
    }

    async fn acquire(&self, key: LockKey) -> KeyGuard {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        self.prune();
        KeyGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Drop entries nobody holds or waits on.
    fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
