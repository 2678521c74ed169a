//! In-memory folder store.
//!
//! Backs the integration tests and the CLI's `memory` backend. State lives
//! behind a single `tokio::sync::RwLock`, so every `commit` is atomic with
//! respect to concurrent readers.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, PermissionId, UserId};
use mediahub_entity::folder::{FileStats, Folder, path};
use mediahub_entity::permission::FolderPermission;

use crate::store::{FolderChanges, FolderFilter, FolderStore, UserDirectory};

/// Direct file statistics for one folder, as stored in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectFileStats {
    /// Folder the files live in.
    pub folder_id: FolderId,
    /// Number of files directly inside the folder.
    pub file_count: i64,
    /// Bytes directly inside the folder.
    pub total_size: i64,
}

/// Serializable image of an in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    /// Known principals.
    pub users: Vec<UserId>,
    /// Folder records, stored as given.
    pub folders: Vec<Folder>,
    /// Permission grants.
    pub permissions: Vec<FolderPermission>,
    /// Direct file statistics per folder.
    pub file_stats: Vec<DirectFileStats>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeSet<UserId>,
    folders: HashMap<FolderId, Folder>,
    permissions: HashMap<PermissionId, FolderPermission>,
    file_stats: HashMap<FolderId, FileStats>,
}

/// Folder store holding everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFolderStore {
    state: Arc<RwLock<State>>,
}

impl MemoryFolderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded from a snapshot.
    ///
    /// Records are taken verbatim, without validating the tree invariants,
    /// so a snapshot can describe a damaged hierarchy.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let state = State {
            users: snapshot.users.into_iter().collect(),
            folders: snapshot.folders.into_iter().map(|f| (f.id, f)).collect(),
            permissions: snapshot
                .permissions
                .into_iter()
                .map(|p| (p.id, p))
                .collect(),
            file_stats: snapshot
                .file_stats
                .into_iter()
                .map(|s| (s.folder_id, FileStats::new(s.file_count, s.total_size)))
                .collect(),
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Parse a JSON snapshot and build a store from it.
    pub fn from_json(source: &str) -> AppResult<Self> {
        let snapshot: StoreSnapshot = serde_json::from_str(source)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Capture the current contents in deterministic order.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;

        let mut folders: Vec<Folder> = state.folders.values().cloned().collect();
        sort_folders(&mut folders);

        let mut permissions: Vec<FolderPermission> = state.permissions.values().cloned().collect();
        permissions.sort_by_key(|p| (p.folder_id, p.user_id, p.id));

        let mut file_stats: Vec<DirectFileStats> = state
            .file_stats
            .iter()
            .map(|(id, s)| DirectFileStats {
                folder_id: *id,
                file_count: s.file_count,
                total_size: s.total_size,
            })
            .collect();
        file_stats.sort_by_key(|s| s.folder_id);

        StoreSnapshot {
            users: state.users.iter().copied().collect(),
            folders,
            permissions,
            file_stats,
        }
    }

    /// Register a principal with the identity directory.
    pub async fn add_user(&self, user_id: UserId) {
        self.state.write().await.users.insert(user_id);
    }

    /// Overwrite the direct file statistics of a folder without touching
    /// any aggregate. Used to seed or to simulate drift in tests.
    pub async fn set_direct_stats(&self, folder_id: FolderId, stats: FileStats) {
        let mut state = self.state.write().await;
        if stats.is_zero() {
            state.file_stats.remove(&folder_id);
        } else {
            state.file_stats.insert(folder_id, stats);
        }
    }

    /// Overwrite a folder record without any bookkeeping.
    ///
    /// Used to simulate drift or corruption in tests.
    pub async fn put_raw(&self, folder: Folder) {
        self.state.write().await.folders.insert(folder.id, folder);
    }

    /// Number of stored folders.
    pub async fn folder_count(&self) -> usize {
        self.state.read().await.folders.len()
    }

    /// Number of stored grants.
    pub async fn permission_count(&self) -> usize {
        self.state.read().await.permissions.len()
    }
}

fn sort_folders(folders: &mut [Folder]) {
    folders.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then(a.sort_order.cmp(&b.sort_order))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then(a.id.cmp(&b.id))
    });
}

fn grant_clashes(state: &State, grant: &FolderPermission) -> bool {
    state.permissions.values().any(|p| {
        p.id != grant.id && p.folder_id == grant.folder_id && p.user_id == grant.user_id
    })
}

/// Direct statistics of every folder named in the batch's deltas, as they
/// will be once the batch is applied.
fn direct_after(
    state: &State,
    changes: &FolderChanges,
    deleted: &BTreeSet<FolderId>,
) -> AppResult<HashMap<FolderId, FileStats>> {
    let mut after: HashMap<FolderId, FileStats> = HashMap::new();
    for (id, delta) in &changes.direct_deltas {
        let known = changes.upserts.iter().any(|f| f.id == *id)
            || (state.folders.contains_key(id) && !deleted.contains(id));
        if !known {
            return Err(AppError::not_found(format!("Folder {id} not found")));
        }
        let current = after
            .get(id)
            .or_else(|| state.file_stats.get(id))
            .copied()
            .unwrap_or_default();
        let next = current
            .checked_add(*delta)
            .filter(|s| !s.is_negative())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "File change would leave folder {id} with invalid statistics"
                ))
            })?;
        after.insert(*id, next);
    }
    Ok(after)
}

fn library_roots(state: &State, owner: UserId) -> Vec<String> {
    state
        .folders
        .values()
        .filter(|f| f.owner_id == owner && f.parent_id.is_none())
        .map(|f| f.path.clone())
        .collect()
}

#[async_trait]
impl FolderStore for MemoryFolderStore {
    async fn list_folders(&self, filter: FolderFilter) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        let mut folders: Vec<Folder> = match filter {
            FolderFilter::All => state.folders.values().cloned().collect(),
            FolderFilter::Library(owner) => {
                let roots = library_roots(&state, owner);
                state
                    .folders
                    .values()
                    .filter(|f| roots.iter().any(|r| path::is_within(&f.path, r)))
                    .cloned()
                    .collect()
            }
            FolderFilter::Subtree(id) => match state.folders.get(&id) {
                Some(anchor) => state
                    .folders
                    .values()
                    .filter(|f| path::is_within(&f.path, &anchor.path))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            },
            FolderFilter::Children(id) => state
                .folders
                .values()
                .filter(|f| f.parent_id == Some(id))
                .cloned()
                .collect(),
            FolderFilter::Roots(owner) => state
                .folders
                .values()
                .filter(|f| f.owner_id == owner && f.parent_id.is_none())
                .cloned()
                .collect(),
        };
        sort_folders(&mut folders);
        Ok(folders)
    }

    async fn get_folder(&self, id: FolderId) -> AppResult<Option<Folder>> {
        Ok(self.state.read().await.folders.get(&id).cloned())
    }

    async fn get_folders(&self, ids: &[FolderId]) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        let mut folders: Vec<Folder> = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| state.folders.get(id).cloned())
            .collect();
        sort_folders(&mut folders);
        Ok(folders)
    }

    async fn commit(&self, changes: FolderChanges) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        let deleted: BTreeSet<FolderId> = changes.deletes.iter().copied().collect();
        for grant in &changes.grants {
            let folder_known = changes.upserts.iter().any(|f| f.id == grant.folder_id)
                || (state.folders.contains_key(&grant.folder_id)
                    && !deleted.contains(&grant.folder_id));
            if !folder_known {
                return Err(AppError::not_found(format!(
                    "Folder {} not found",
                    grant.folder_id
                )));
            }
            if grant_clashes(&state, grant) {
                return Err(AppError::conflict(format!(
                    "User {} already holds a grant on folder {}",
                    grant.user_id, grant.folder_id
                )));
            }
        }

        let direct = direct_after(&state, &changes, &deleted)?;

        for id in &deleted {
            state.folders.remove(id);
            state.file_stats.remove(id);
        }
        if !deleted.is_empty() {
            state
                .permissions
                .retain(|_, p| !deleted.contains(&p.folder_id));
        }
        for folder in changes.upserts.iter() {
            state.folders.insert(folder.id, folder.clone());
        }
        for grant in changes.grants.iter() {
            state.permissions.insert(grant.id, grant.clone());
        }
        for (id, stats) in direct {
            if stats.is_zero() {
                state.file_stats.remove(&id);
            } else {
                state.file_stats.insert(id, stats);
            }
        }

        debug!(
            upserts = changes.upserts.len(),
            deletes = changes.deletes.len(),
            grants = changes.grants.len(),
            direct_deltas = changes.direct_deltas.len(),
            "Folder changes committed"
        );
        Ok(())
    }

    async fn list_permissions(&self, folder_id: FolderId) -> AppResult<Vec<FolderPermission>> {
        let state = self.state.read().await;
        let mut grants: Vec<FolderPermission> = state
            .permissions
            .values()
            .filter(|p| p.folder_id == folder_id)
            .cloned()
            .collect();
        grants.sort_by_key(|p| (p.granted_at, p.id));
        Ok(grants)
    }

    async fn list_user_permissions(
        &self,
        user_id: UserId,
        folder_ids: &[FolderId],
    ) -> AppResult<Vec<FolderPermission>> {
        let wanted: BTreeSet<FolderId> = folder_ids.iter().copied().collect();
        let state = self.state.read().await;
        let mut grants: Vec<FolderPermission> = state
            .permissions
            .values()
            .filter(|p| p.user_id == user_id && wanted.contains(&p.folder_id))
            .cloned()
            .collect();
        grants.sort_by_key(|p| (p.folder_id, p.id));
        Ok(grants)
    }

    async fn get_permission(&self, id: PermissionId) -> AppResult<Option<FolderPermission>> {
        Ok(self.state.read().await.permissions.get(&id).cloned())
    }

    async fn save_permission(&self, permission: &FolderPermission) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.folders.contains_key(&permission.folder_id) {
            return Err(AppError::not_found(format!(
                "Folder {} not found",
                permission.folder_id
            )));
        }
        if grant_clashes(&state, permission) {
            return Err(AppError::conflict(format!(
                "User {} already holds a grant on folder {}",
                permission.user_id, permission.folder_id
            )));
        }
        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn delete_permission(&self, id: PermissionId) -> AppResult<bool> {
        Ok(self.state.write().await.permissions.remove(&id).is_some())
    }

    async fn direct_file_stats(&self, ids: &[FolderId]) -> AppResult<HashMap<FolderId, FileStats>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.file_stats.get(id).map(|s| (*id, *s)))
            .collect())
    }
}

#[async_trait]
impl UserDirectory for MemoryFolderStore {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool> {
        Ok(self.state.read().await.users.contains(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahub_core::ErrorKind;
    use mediahub_entity::permission::PermissionLevel;

    fn owner() -> UserId {
        UserId::from_u128(100)
    }

    async fn seeded() -> (MemoryFolderStore, Folder, Folder, Folder) {
        let store = MemoryFolderStore::new();
        let root = Folder::new(FolderId::from_u128(1), owner(), None, "Root", 0);
        let a = Folder::new(FolderId::from_u128(2), owner(), Some(&root), "A", 0);
        let b = Folder::new(FolderId::from_u128(3), owner(), Some(&a), "B", 0);
        store
            .save_folders(&[root.clone(), a.clone(), b.clone()])
            .await
            .unwrap();
        (store, root, a, b)
    }

    #[tokio::test]
    async fn test_filters() {
        let (store, root, a, b) = seeded().await;
        let other = Folder::new(FolderId::from_u128(9), UserId::from_u128(7), None, "X", 0);
        store.save_folder(&other).await.unwrap();

        let all = store.list_folders(FolderFilter::All).await.unwrap();
        assert_eq!(all.len(), 4);

        let library = store
            .list_folders(FolderFilter::Library(owner()))
            .await
            .unwrap();
        let ids: Vec<FolderId> = library.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![root.id, a.id, b.id]);

        let subtree = store
            .list_folders(FolderFilter::Subtree(a.id))
            .await
            .unwrap();
        assert_eq!(subtree.len(), 2);

        let children = store
            .list_folders(FolderFilter::Children(root.id))
            .await
            .unwrap();
        assert_eq!(children, vec![a]);

        let roots = store
            .list_folders(FolderFilter::Roots(owner()))
            .await
            .unwrap();
        assert_eq!(roots, vec![root]);
    }

    #[tokio::test]
    async fn test_commit_delete_drops_grants_and_stats() {
        let (store, _root, a, b) = seeded().await;
        let grant = FolderPermission::new(b.id, owner(), PermissionLevel::Admin, owner(), None);
        store.save_permission(&grant).await.unwrap();
        store.set_direct_stats(b.id, FileStats::new(2, 20)).await;

        store
            .commit(FolderChanges {
                deletes: vec![a.id, b.id],
                ..FolderChanges::default()
            })
            .await
            .unwrap();

        assert_eq!(store.folder_count().await, 1);
        assert_eq!(store.permission_count().await, 0);
        assert!(store.direct_file_stats(&[b.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_applies_direct_deltas_atomically() {
        let (store, root, a, _b) = seeded().await;
        store
            .commit(
                FolderChanges::default()
                    .with_direct_delta(a.id, FileStats::new(2, 200))
                    .with_direct_delta(a.id, FileStats::new(-1, -50)),
            )
            .await
            .unwrap();
        let direct = store.direct_file_stats(&[a.id]).await.unwrap();
        assert_eq!(direct[&a.id], FileStats::new(1, 150));

        let mut renamed = root.clone();
        renamed.name = "Renamed".to_string();
        let err = store
            .commit(
                FolderChanges::upsert(vec![renamed])
                    .with_direct_delta(a.id, FileStats::new(-2, 0)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(store.get_folder(root.id).await.unwrap().unwrap().name, "Root");
        assert_eq!(
            store.direct_file_stats(&[a.id]).await.unwrap()[&a.id],
            FileStats::new(1, 150)
        );

        let err = store
            .commit(FolderChanges::default().with_direct_delta(a.id, FileStats::new(0, i64::MAX)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = store
            .commit(
                FolderChanges::default()
                    .with_direct_delta(FolderId::from_u128(404), FileStats::new(1, 1)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        store
            .commit(FolderChanges::default().with_direct_delta(a.id, FileStats::new(-1, -150)))
            .await
            .unwrap();
        assert!(store.direct_file_stats(&[a.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_grant_per_user_and_folder() {
        let (store, root, _a, _b) = seeded().await;
        let first = FolderPermission::new(root.id, owner(), PermissionLevel::View, owner(), None);
        store.save_permission(&first).await.unwrap();

        let second = FolderPermission::new(root.id, owner(), PermissionLevel::Edit, owner(), None);
        let err = store.save_permission(&second).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let orphan = FolderPermission::new(
            FolderId::from_u128(77),
            owner(),
            PermissionLevel::View,
            owner(),
            None,
        );
        let err = store.save_permission(&orphan).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_snapshot_json_round_trip() {
        let (store, _root, a, _b) = seeded().await;
        store.add_user(owner()).await;
        store.set_direct_stats(a.id, FileStats::new(1, 5)).await;

        let json = serde_json::to_string(&store.snapshot().await).unwrap();
        let restored = MemoryFolderStore::from_json(&json).unwrap();

        assert_eq!(restored.snapshot().await, store.snapshot().await);
        assert!(restored.user_exists(owner()).await.unwrap());
        assert!(!restored.user_exists(UserId::from_u128(5)).await.unwrap());
    }
}
