//! Per-tree write locks.
//!
//! Mutations are serialized per top-level folder tree. A mutation names the
//! folders it touches; the manager locks the tree root of each (and, for
//! writes to a user's root namespace, that user's library), always in sorted
//! key order. After acquiring, the folders are re-read: if one of them moved
//! into another tree in the meantime, the locks are released and acquisition
//! is retried.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use mediahub_core::config::LockingConfig;
use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, UserId};
use mediahub_database::FolderStore;
use mediahub_entity::folder::Folder;

/// Something a mutation can hold exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// A user's set of root folders (root creation, moves to root).
    Library(UserId),
    /// A top-level folder tree, keyed by its root id.
    Tree(FolderId),
}

type LockMap = DashMap<LockKey, Arc<Mutex<()>>>;

/// Held locks; released on drop.
///
/// Dropping the guard also removes each key's mutex from the manager once no
/// other task holds or waits on it, so deleted trees leave nothing behind.
#[derive(Debug)]
pub struct TreeLockGuard {
    locks: Arc<LockMap>,
    held: Vec<(LockKey, OwnedMutexGuard<()>)>,
}

impl TreeLockGuard {
    /// Keys held by this guard, sorted.
    pub fn keys(&self) -> Vec<LockKey> {
        self.held.iter().map(|(key, _)| *key).collect()
    }
}

impl Drop for TreeLockGuard {
    fn drop(&mut self) {
        while let Some((key, guard)) = self.held.pop() {
            drop(guard);
            forget_if_idle(&self.locks, key);
        }
    }
}

/// Remove a key's mutex when the map holds the only reference. Runs under
/// the shard lock that `acquire` clones under, so no waiter can slip in.
fn forget_if_idle(locks: &LockMap, key: LockKey) {
    locks.remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
}

/// Hands out per-tree mutexes.
#[derive(Debug, Clone)]
pub struct TreeLockManager {
    locks: Arc<LockMap>,
    config: LockingConfig,
}

impl TreeLockManager {
    /// Create a lock manager.
    pub fn new(config: LockingConfig) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Lock the trees containing `folders`, plus any extra libraries.
    ///
    /// Folders that do not exist are ignored; the caller's own validation
    /// reports them.
    pub async fn lock_folders(
        &self,
        store: &dyn FolderStore,
        folders: &[FolderId],
        libraries: &[UserId],
    ) -> AppResult<TreeLockGuard> {
        let attempts = self.config.max_retries + 1;
        for attempt in 1..=attempts {
            let keys = Self::keys_for(store, folders, libraries).await?;
            let guard = self.acquire(keys.clone()).await?;

            let confirmed = Self::keys_for(store, folders, libraries).await?;
            if confirmed == keys {
                return Ok(guard);
            }

            debug!(attempt, "Folder changed tree while locking, retrying");
        }

        warn!(
            folders = ?folders,
            attempts,
            "Could not obtain a stable set of tree locks"
        );
        Err(AppError::service_unavailable(
            "Folder tree is being modified concurrently, try again",
        ))
    }

    /// Acquire the given keys in sorted order, with a timeout.
    pub async fn acquire(&self, keys: BTreeSet<LockKey>) -> AppResult<TreeLockGuard> {
        let timeout = Duration::from_millis(self.config.acquire_timeout_ms);
        let mut guard = TreeLockGuard {
            locks: Arc::clone(&self.locks),
            held: Vec::with_capacity(keys.len()),
        };

        for key in keys {
            let mutex = self
                .locks
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            match tokio::time::timeout(timeout, mutex.lock_owned()).await {
                Ok(held) => guard.held.push((key, held)),
                Err(_) => {
                    forget_if_idle(&self.locks, key);
                    warn!(key = ?key, timeout_ms = self.config.acquire_timeout_ms, "Tree lock timed out");
                    return Err(AppError::service_unavailable(format!(
                        "Timed out waiting for lock on {key:?}"
                    )));
                }
            }
        }

        Ok(guard)
    }

    /// Number of keys with a live mutex.
    pub fn tracked_keys(&self) -> usize {
        self.locks.len()
    }

    async fn keys_for(
        store: &dyn FolderStore,
        folders: &[FolderId],
        libraries: &[UserId],
    ) -> AppResult<BTreeSet<LockKey>> {
        let records = store.get_folders(folders).await?;
        let mut keys: BTreeSet<LockKey> = records.iter().map(tree_key).collect();
        keys.extend(libraries.iter().map(|u| LockKey::Library(*u)));
        Ok(keys)
    }
}

fn tree_key(folder: &Folder) -> LockKey {
    LockKey::Tree(folder.tree_root_id().unwrap_or(folder.id))
}
