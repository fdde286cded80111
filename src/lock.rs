//! Mutual exclusion keyed by process instance
//!
//! The join path holds one of these for the whole read-count-decide-mark
//! sequence. Production deployments plug in a distributed lock; the memory
//! implementation covers a single engine process.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use uuid::Uuid;

/// Lock contract used by the join synchronizer.
///
/// `owner` identifies one acquire/release pairing. Releasing a key the owner
/// does not hold (for instance after a failed `try_lock`) must be a no-op, so
/// callers can run the release step on every exit path.
#[async_trait]
pub trait LockStrategy: Send + Sync {
    async fn try_lock(&self, key: &str, owner: Uuid) -> Result<()>;
    async fn unlock(&self, key: &str, owner: Uuid) -> Result<()>;
}

/// Single-process [`LockStrategy`]. Waits up to `acquire_timeout` for a held
/// key before giving up. Not reentrant.
#[derive(Debug)]
pub struct MemoryLockStrategy {
    holders: Mutex<HashMap<String, Uuid>>,
    released: Notify,
    acquire_timeout: Duration,
}

impl MemoryLockStrategy {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self {
            holders: Mutex::new(HashMap::new()),
            released: Notify::new(),
            acquire_timeout,
        }
    }

    /// Current holder of `key`, if any.
    pub async fn holder(&self, key: &str) -> Option<Uuid> {
        self.holders.lock().await.get(key).copied()
    }
}

impl Default for MemoryLockStrategy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl LockStrategy for MemoryLockStrategy {
    async fn try_lock(&self, key: &str, owner: Uuid) -> Result<()> {
        let deadline = Instant::now() + self.acquire_timeout;
        loop {
            // Register interest before checking so a release in between is not lost.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            {
                let mut holders = self.holders.lock().await;
                match holders.get(key) {
                    None => {
                        holders.insert(key.to_string(), owner);
                        tracing::trace!(key, %owner, "lock acquired");
                        return Ok(());
                    }
                    Some(holder) if *holder == owner => {
                        bail!("lock '{key}' is already held by {owner}; reentrant acquisition is not supported");
                    }
                    Some(_) => {}
                }
            }

            if tokio::time::timeout_at(deadline, released).await.is_err() {
                return Err(anyhow!(
                    "timed out after {}ms waiting for lock '{key}'",
                    self.acquire_timeout.as_millis()
                ));
            }
        }
    }

    async fn unlock(&self, key: &str, owner: Uuid) -> Result<()> {
        let mut holders = self.holders.lock().await;
        if holders.get(key) == Some(&owner) {
            holders.remove(key);
            drop(holders);
            tracing::trace!(key, %owner, "lock released");
            self.released.notify_waiters();
        }
        Ok(())
    }
}
