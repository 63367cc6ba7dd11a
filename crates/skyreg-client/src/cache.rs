//! Per-entry revision cache.
//!
//! Remembers the last revision this client observed or published for each
//! `(owner, data key)`. Locking is two-level:
//!
//! - a short-lived map lock guards creation of cache slots;
//! - a per-entry async mutex guards a whole read-modify-write sequence.
//!
//! The per-entry lock is never queued on. A second caller for a key that is
//! already locked gets [`ClientError::ConcurrentAccess`] immediately, which
//! makes a logical race visible instead of silently serializing it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use skyreg_crypto::ed25519::VerifyingKey;
use skyreg_registry::{DataKey, MAX_REVISION};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::{ClientError, Result};

type CacheKey = (VerifyingKey, DataKey);

/// Cached state for one registry entry.
#[derive(Debug, Default)]
pub struct CachedRevision {
    /// `None` until the entry has been read or written through this cache.
    revision: Option<u64>,
}

/// Map from `(owner, data key)` to cached revisions.
#[derive(Debug, Default)]
pub struct RevisionCache {
    entries: Mutex<HashMap<CacheKey, Arc<AsyncMutex<CachedRevision>>>>,
}

impl RevisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the unique cache slot for a key, creating it if absent.
    ///
    /// The map lock is held only for the lookup/insert.
    pub fn get_or_create(
        &self,
        owner: &VerifyingKey,
        data_key: &DataKey,
    ) -> Arc<AsyncMutex<CachedRevision>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry((owner.clone(), *data_key))
            .or_insert_with(|| {
                debug!(owner = %owner, %data_key, "Created revision cache slot");
                Arc::new(AsyncMutex::new(CachedRevision::default()))
            })
            .clone()
    }

    /// Take the per-entry lock without waiting.
    ///
    /// The returned guard releases the lock when dropped, including when the
    /// owning future is cancelled.
    pub fn lock(&self, owner: &VerifyingKey, data_key: &DataKey) -> Result<RevisionGuard> {
        let slot = self.get_or_create(owner, data_key);
        let inner = slot.try_lock_owned().map_err(|_| {
            warn!(owner = %owner, %data_key, "Entry is already locked by an in-flight operation");
            ClientError::ConcurrentAccess {
                data_key: *data_key,
            }
        })?;
        Ok(RevisionGuard {
            inner,
            data_key: *data_key,
        })
    }

    /// Run `f` with exclusive access to the entry's cached revision.
    pub async fn with_lock<F, Fut, T>(
        &self,
        owner: &VerifyingKey,
        data_key: &DataKey,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(RevisionGuard) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.lock(owner, data_key)?;
        f(guard).await
    }

    /// Peek at the cached revision for a key.
    ///
    /// Returns `None` if the key is uncached, unknown, or currently locked.
    pub fn cached_revision(&self, owner: &VerifyingKey, data_key: &DataKey) -> Option<u64> {
        let slot = {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.get(&(owner.clone(), *data_key))?.clone()
        };
        let cached = slot.try_lock().ok()?;
        cached.revision
    }

    /// Number of keys with a cache slot.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one entry's cached revision.
#[derive(Debug)]
pub struct RevisionGuard {
    inner: OwnedMutexGuard<CachedRevision>,
    data_key: DataKey,
}

impl RevisionGuard {
    /// The cached revision, `None` if uncached.
    pub fn revision(&self) -> Option<u64> {
        self.inner.revision
    }

    /// The revision the next write must use.
    ///
    /// Derived only from the cached value: `0` when uncached, otherwise one
    /// past the cached revision.
    pub fn next_revision(&self) -> Result<u64> {
        match self.inner.revision {
            None => Ok(0),
            Some(cached) if cached >= MAX_REVISION => Err(ClientError::RevisionOverflow {
                data_key: self.data_key,
            }),
            Some(cached) => Ok(cached + 1),
        }
    }

    /// Record a revision read from the registry.
    ///
    /// Fails with [`ClientError::StaleRevision`] if it is lower than what this
    /// client has already seen; the cache is left unchanged in that case.
    pub fn observe(&mut self, revision: u64) -> Result<()> {
        if let Some(cached) = self.inner.revision {
            if revision < cached {
                return Err(ClientError::StaleRevision {
                    cached,
                    received: revision,
                });
            }
        }
        self.inner.revision = Some(revision);
        Ok(())
    }

    /// Record a revision this client successfully published.
    pub fn confirm(&mut self, revision: u64) {
        debug_assert!(self.inner.revision.map_or(true, |cached| revision > cached));
        self.inner.revision = Some(revision);
    }
}
