//! Keyed async locks
//!
//! One `tokio::sync::Mutex` per key, created on first use. Guards are owned
//! so they can be held across store calls. An entry lives only while a guard
//! or a waiter references it; the last guard to drop removes it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Arc<LockMap>,
}

/// Per-product read-modify-write exclusion
pub type ProductLocks = KeyedLocks;

/// Exclusive access to one key; releases (and evicts idle entries) on drop
#[derive(Debug)]
pub struct KeyedGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        self.guard.take();
        // 分片锁内判断，与 lock() 中的克隆互斥
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        // 先克隆 Arc，释放 DashMap 分片锁后再等待
        let mutex = self.locks.entry(key.to_string()).or_default().clone();
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            key: key.to_string(),
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
