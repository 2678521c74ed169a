//! Partial, in-memory view of the folder store used to validate a mutation.

use std::collections::{HashMap, HashSet};

use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::types::FolderId;
use mediahub_database::FolderStore;
use mediahub_entity::folder::{Folder, path};

/// Folder records loaded for one operation, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct FolderSnapshot {
    folders: HashMap<FolderId, Folder>,
}

impl FolderSnapshot {
    /// Build a snapshot from records. Later duplicates replace earlier ones.
    pub fn new(records: impl IntoIterator<Item = Folder>) -> Self {
        Self {
            folders: records.into_iter().map(|f| (f.id, f)).collect(),
        }
    }

    /// Look up a record.
    pub fn get(&self, id: FolderId) -> Option<&Folder> {
        self.folders.get(&id)
    }

    /// Add or replace a record.
    pub fn insert(&mut self, folder: Folder) {
        self.folders.insert(folder.id, folder);
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// The folder and every record whose path lies below it.
    pub fn subtree(&self, root: &Folder) -> Vec<&Folder> {
        self.folders
            .values()
            .filter(|f| path::is_within(&f.path, &root.path))
            .collect()
    }

    /// Ids of the ancestors of `id`, nearest first, following `parent_id`.
    ///
    /// A chain that revisits a folder or names a record that is not in the
    /// snapshot is a `StructuralIntegrity` error.
    pub fn ancestors(&self, id: FolderId) -> AppResult<Vec<FolderId>> {
        let start = self
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;

        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = start.parent_id;
        while let Some(parent) = current {
            if !seen.insert(parent) {
                return Err(AppError::structural_integrity(format!(
                    "Parent chain of folder {id} loops at {parent}"
                )));
            }
            let record = self.get(parent).ok_or_else(|| {
                AppError::structural_integrity(format!(
                    "Ancestor {parent} of folder {id} is missing"
                ))
            })?;
            chain.push(parent);
            current = record.parent_id;
        }
        Ok(chain)
    }

    /// Fetch the ancestors of `id` that are not loaded yet.
    ///
    /// Ids named in the stored path are fetched in one batch; any gap left
    /// by a drifted path is then filled by following `parent_id` one record
    /// at a time. Loading stops quietly at a loop or a missing record so the
    /// caller's validation can report it.
    pub async fn load_ancestry(&mut self, store: &dyn FolderStore, id: FolderId) -> AppResult<()> {
        let Some(start) = self.get(id) else {
            return Ok(());
        };

        if let Ok(chain) = path::parse_path(&start.path) {
            let missing: Vec<FolderId> = chain
                .into_iter()
                .filter(|a| !self.folders.contains_key(a))
                .collect();
            if !missing.is_empty() {
                for folder in store.get_folders(&missing).await? {
                    self.insert(folder);
                }
            }
        }

        let mut seen = HashSet::from([id]);
        let mut current = self.get(id).and_then(|f| f.parent_id);
        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            if let Some(record) = self.get(parent) {
                current = record.parent_id;
                continue;
            }
            match store.get_folder(parent).await? {
                Some(record) => {
                    current = record.parent_id;
                    self.insert(record);
                }
                None => break,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahub_core::ErrorKind;
    use mediahub_core::types::UserId;

    const OWNER: UserId = UserId::from_u128(1);

    #[test]
    fn test_ancestors_nearest_first() {
        let root = Folder::new(FolderId::from_u128(1), OWNER, None, "Root", 0);
        let a = Folder::new(FolderId::from_u128(2), OWNER, Some(&root), "A", 0);
        let b = Folder::new(FolderId::from_u128(3), OWNER, Some(&a), "B", 0);
        let snap = FolderSnapshot::new([root.clone(), a.clone(), b.clone()]);

        assert_eq!(snap.ancestors(b.id).unwrap(), vec![a.id, root.id]);
        assert!(snap.ancestors(root.id).unwrap().is_empty());
        assert_eq!(snap.subtree(&a).len(), 2);
    }

    #[test]
    fn test_ancestors_detect_loop_and_gap() {
        let root = Folder::new(FolderId::from_u128(1), OWNER, None, "Root", 0);
        let mut a = Folder::new(FolderId::from_u128(2), OWNER, Some(&root), "A", 0);
        let mut b = Folder::new(FolderId::from_u128(3), OWNER, Some(&a), "B", 0);
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        let looped = FolderSnapshot::new([a.clone(), b.clone()]);
        let err = looped.ancestors(a.id).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralIntegrity);

        let child = Folder::new(FolderId::from_u128(4), OWNER, Some(&root), "C", 0);
        let gap = FolderSnapshot::new([child.clone()]);
        let err = gap.ancestors(child.id).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralIntegrity);
    }
}
