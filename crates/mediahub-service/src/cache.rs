//! Built-tree cache backed by moka.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mediahub_core::config::CacheConfig;
use mediahub_core::types::{FolderId, UserId};
use mediahub_entity::folder::FolderForest;

/// The set of folders a tree read covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum TreeScope {
    /// Every tree whose root is owned by the user.
    Library(UserId),
    /// One folder and all of its descendants.
    Subtree(FolderId),
}

/// Caches built forests per scope.
///
/// Any mutation invalidates every entry; forests are rebuilt on the next
/// read.
#[derive(Debug, Clone)]
pub struct TreeCache {
    cache: Option<Cache<TreeScope, Arc<FolderForest>>>,
}

impl TreeCache {
    /// Create a cache from configuration. A disabled cache stores nothing.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = config.enabled.then(|| {
            Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(Duration::from_secs(config.time_to_live_seconds))
                .build()
        });
        Self { cache }
    }

    /// Look up a cached forest.
    pub async fn get(&self, scope: &TreeScope) -> Option<Arc<FolderForest>> {
        let cache = self.cache.as_ref()?;
        let hit = cache.get(scope).await;
        debug!(scope = ?scope, hit = hit.is_some(), "Tree cache lookup");
        hit
    }

    /// Store a freshly built forest.
    pub async fn insert(&self, scope: TreeScope, forest: Arc<FolderForest>) {
        if let Some(cache) = &self.cache {
            cache.insert(scope, forest).await;
        }
    }

    /// Drop every cached forest.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            debug!("Tree cache invalidated");
        }
    }
}
