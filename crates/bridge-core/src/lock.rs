//! The store-wide bridge lock.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One coarse async mutex shared by everything that writes mappings.
///
/// The reply path holds it from "post annotation" until "mapping written".
/// The annotation→message lookup waits on it before reading, which is what
/// keeps the poller from bridging a reply annotation whose mapping is still
/// being recorded.
#[derive(Clone, Default)]
pub struct BridgeLock {
    inner: Arc<Mutex<()>>,
}

/// Held while the lock is taken. Dropping it unlocks.
#[must_use = "the bridge lock is released as soon as the guard is dropped"]
pub struct BridgeLockGuard {
    _guard: OwnedMutexGuard<()>,
}

impl BridgeLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock.
    pub async fn acquire(&self) -> BridgeLockGuard {
        BridgeLockGuard {
            _guard: self.inner.clone().lock_owned().await,
        }
    }

    /// Wait until no one holds the lock, without keeping it.
    pub async fn wait_unlocked(&self) {
        drop(self.inner.lock().await);
    }

    /// Whether someone currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

impl std::fmt::Debug for BridgeLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn guard_releases_on_drop() {
        let lock = BridgeLock::new();
        let guard = lock.acquire().await;
        assert!(lock.is_locked());
        drop(guard);
        assert!(!lock.is_locked());
    }

    #[tokio::test]
    async fn wait_unlocked_blocks_until_release() {
        let lock = BridgeLock::new();
        let guard = lock.acquire().await;

        let waiter = {
            let lock = lock.clone();
            tokio::spawn(async move { lock.wait_unlocked().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish once the guard is dropped")
            .unwrap();
        assert!(!lock.is_locked());
    }
}
