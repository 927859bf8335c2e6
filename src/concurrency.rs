//! Locking primitives for the rollback store
//!
//! Two layers:
//! - [`KeyLockManager`] hands out one in-process lock per key (a content hash, a
//!   transaction id) so writers for the same key are serialized while distinct keys proceed
//!   in parallel.
//! - [`StoreLock`] is an advisory exclusive lock on `<base>/LOCK`, held by snapshot
//!   create/restore/delete so two processes never mutate the snapshot tree at once.
//!
//! Advisory locks are per open file description, so a `StoreLock` must never be taken twice
//! on the same call path.

use crate::error::RollbackError;
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOCK_FILE_NAME: &str = "LOCK";

/// Per-key lock registry
#[derive(Default)]
pub struct KeyLockManager {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl KeyLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a key
    pub fn get_lock(&self, key: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Run `f` under the write lock for `key`
    ///
    /// The registry entry is removed afterwards unless another caller still holds it, so
    /// the map only ever contains keys that are in use.
    pub fn with_write_lock<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.get_lock(key);
        let result = {
            let _guard = lock.write();
            f()
        };
        drop(lock);
        let mut locks = self.locks.lock();
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
        result
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cross-process advisory lock on a store directory; released on drop
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Block until the exclusive lock on `<dir>/LOCK` is held
    pub fn acquire(dir: &Path) -> Result<Self, RollbackError> {
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| RollbackError::Lock {
                path: path.clone(),
                source,
            })?;
        file.lock_exclusive().map_err(|source| RollbackError::Lock {
            path: path.clone(),
            source,
        })?;
        tracing::trace!(lock = %path.display(), "Store lock acquired");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), error = %e, "Failed to release store lock");
        }
    }
}
