//! Store traits consumed by the hierarchy engine.

use std::collections::HashMap;

use async_trait::async_trait;

use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, PermissionId, UserId};
use mediahub_entity::folder::{FileStats, Folder};
use mediahub_entity::permission::FolderPermission;

/// Which folder records a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderFilter {
    /// Every folder.
    All,
    /// Every folder in a tree whose root is owned by the user.
    Library(UserId),
    /// The folder and all of its descendants.
    Subtree(FolderId),
    /// Direct children of the folder.
    Children(FolderId),
    /// Root folders owned by the user.
    Roots(UserId),
}

/// A set of folder writes applied atomically.
#[derive(Debug, Clone, Default)]
pub struct FolderChanges {
    /// Records inserted or replaced by id.
    pub upserts: Vec<Folder>,
    /// Folders removed; their permission grants and file stats go with them.
    pub deletes: Vec<FolderId>,
    /// Grants inserted or replaced alongside the folder writes.
    pub grants: Vec<FolderPermission>,
    /// Signed changes to folders' direct file statistics. A change that
    /// would leave a folder with negative direct statistics fails the batch.
    pub direct_deltas: Vec<(FolderId, FileStats)>,
}

impl FolderChanges {
    /// Changes that only upsert records.
    pub fn upsert(folders: Vec<Folder>) -> Self {
        Self {
            upserts: folders,
            ..Self::default()
        }
    }

    /// Add a grant to the batch.
    pub fn with_grant(mut self, grant: FolderPermission) -> Self {
        self.grants.push(grant);
        self
    }

    /// Add a change to a folder's direct file statistics to the batch.
    pub fn with_direct_delta(mut self, folder_id: FolderId, delta: FileStats) -> Self {
        self.direct_deltas.push((folder_id, delta));
        self
    }

    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty()
            && self.deletes.is_empty()
            && self.grants.is_empty()
            && self.direct_deltas.is_empty()
    }
}

/// Durable storage for folders, grants, and direct file statistics.
///
/// Every write method is atomic: either all of its records are stored or
/// none are.
#[async_trait]
pub trait FolderStore: Send + Sync + std::fmt::Debug + 'static {
    /// List folders matching a filter, ordered by depth then sort order.
    async fn list_folders(&self, filter: FolderFilter) -> AppResult<Vec<Folder>>;

    /// Find a folder by ID.
    async fn get_folder(&self, id: FolderId) -> AppResult<Option<Folder>>;

    /// Find several folders by ID; missing ids are skipped.
    async fn get_folders(&self, ids: &[FolderId]) -> AppResult<Vec<Folder>>;

    /// Apply deletes, then folder upserts, then grants, then direct stats
    /// deltas in one transaction.
    async fn commit(&self, changes: FolderChanges) -> AppResult<()>;

    /// Upsert a single folder.
    async fn save_folder(&self, folder: &Folder) -> AppResult<()> {
        self.commit(FolderChanges::upsert(vec![folder.clone()]))
            .await
    }

    /// Upsert a batch of folders atomically.
    async fn save_folders(&self, folders: &[Folder]) -> AppResult<()> {
        self.commit(FolderChanges::upsert(folders.to_vec())).await
    }

    /// List every grant on a folder, expired ones included.
    async fn list_permissions(&self, folder_id: FolderId) -> AppResult<Vec<FolderPermission>>;

    /// List a user's grants on any of the given folders.
    async fn list_user_permissions(
        &self,
        user_id: UserId,
        folder_ids: &[FolderId],
    ) -> AppResult<Vec<FolderPermission>>;

    /// Find a grant by ID.
    async fn get_permission(&self, id: PermissionId) -> AppResult<Option<FolderPermission>>;

    /// Insert or replace a grant by id.
    async fn save_permission(&self, permission: &FolderPermission) -> AppResult<()>;

    /// Delete a grant. Returns `true` if it existed.
    async fn delete_permission(&self, id: PermissionId) -> AppResult<bool>;

    /// Direct (non-recursive) file statistics per folder.
    ///
    /// Folders without files may be absent from the result.
    async fn direct_file_stats(&self, ids: &[FolderId]) -> AppResult<HashMap<FolderId, FileStats>>;
}

/// Identity collaborator: answers whether a principal exists.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Check whether the user exists.
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool>;
}
