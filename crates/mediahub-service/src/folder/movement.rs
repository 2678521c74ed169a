//! Folder move (reparent) engine.
//!
//! Validation runs against a snapshot loaded just before the move, in this
//! order:
//! 1. the folder and the target exist (`NotFound`);
//! 2. the target is not the folder itself (`CyclicMove`);
//! 3. the target is not a descendant of the folder (`CyclicMove`); a parent
//!    chain that loops or breaks is `StructuralIntegrity`;
//! 4. no sibling under the target has the same name (`DuplicateName`);
//! 5. the deepest moved folder stays within the depth limit (`Validation`).
//!
//! A successful plan rewrites the path and depth of every folder in the
//! moved subtree and shifts the subtree's aggregate statistics from the old
//! ancestors to the new ones. Ancestors shared by both chains net to zero
//! and are left alone.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use mediahub_core::config::HierarchyConfig;
use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::types::FolderId;
use mediahub_database::{FolderChanges, FolderFilter, FolderStore};
use mediahub_entity::folder::{FileStats, Folder, path};

use super::snapshot::FolderSnapshot;

/// Everything a move plan is computed from.
#[derive(Debug, Clone, Default)]
pub struct MoveInput {
    /// The folder, its subtree, both ancestor chains, and the target.
    pub snapshot: FolderSnapshot,
    /// Folders that would become siblings of the moved folder.
    pub siblings: Vec<Folder>,
}

/// The outcome of a validated move.
#[derive(Debug, Clone)]
pub struct MovePlan {
    /// The moved folder as it will be stored.
    pub folder: Folder,
    /// Parent before the move.
    pub from_parent: Option<FolderId>,
    /// Records to write, as one batch.
    pub changes: FolderChanges,
    /// Number of descendants whose path and depth were rewritten.
    pub descendants_rewritten: usize,
    /// True when the target is already the folder's parent.
    pub no_op: bool,
}

/// Validates moves and computes the records they rewrite.
#[derive(Debug, Clone)]
pub struct MoveEngine {
    hierarchy: HierarchyConfig,
}

impl MoveEngine {
    /// Create a move engine with the given tree limits.
    pub fn new(hierarchy: HierarchyConfig) -> Self {
        Self { hierarchy }
    }

    /// Load the records needed to plan moving `folder_id` under `target`.
    ///
    /// Missing folders are left out; [`plan`](Self::plan) reports them.
    pub async fn load(
        &self,
        store: &dyn FolderStore,
        folder_id: FolderId,
        target: Option<FolderId>,
    ) -> AppResult<MoveInput> {
        let Some(folder) = store.get_folder(folder_id).await? else {
            return Ok(MoveInput::default());
        };
        let owner = folder.owner_id;

        let mut snapshot =
            FolderSnapshot::new(store.list_folders(FolderFilter::Subtree(folder_id)).await?);
        snapshot.insert(folder);
        snapshot.load_ancestry(store, folder_id).await?;

        let siblings = match target {
            Some(target_id) => {
                if snapshot.get(target_id).is_none() {
                    match store.get_folder(target_id).await? {
                        Some(record) => snapshot.insert(record),
                        None => return Ok(MoveInput { snapshot, siblings: Vec::new() }),
                    }
                }
                snapshot.load_ancestry(store, target_id).await?;
                store.list_folders(FolderFilter::Children(target_id)).await?
            }
            None => store.list_folders(FolderFilter::Roots(owner)).await?,
        };

        Ok(MoveInput { snapshot, siblings })
    }

    /// Validate a move and compute its effect. Pure: nothing is written.
    pub fn plan(
        &self,
        input: &MoveInput,
        folder_id: FolderId,
        target: Option<FolderId>,
        now: DateTime<Utc>,
    ) -> AppResult<MovePlan> {
        let snap = &input.snapshot;
        let folder = snap
            .get(folder_id)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
        let target_record = match target {
            Some(id) => Some(snap.get(id).ok_or_else(|| {
                AppError::not_found(format!("Target folder {id} not found"))
            })?),
            None => None,
        };

        if let Some(parent) = target_record {
            self.reject_cycle(snap, folder, parent)?;
        }

        if folder.parent_id == target {
            return Ok(MovePlan {
                folder: folder.clone(),
                from_parent: folder.parent_id,
                changes: FolderChanges::default(),
                descendants_rewritten: 0,
                no_op: true,
            });
        }

        let key = self.hierarchy.name_key(&folder.name);
        if input
            .siblings
            .iter()
            .any(|s| s.id != folder.id && self.hierarchy.name_key(&s.name) == key)
        {
            return Err(AppError::duplicate_name(format!(
                "A folder named '{}' already exists in the destination",
                folder.name
            )));
        }

        let new_depth = target_record.map(|t| t.depth + 1).unwrap_or(0);
        let subtree = snap.subtree(folder);
        let deepest = subtree
            .iter()
            .map(|f| f.depth - folder.depth)
            .max()
            .unwrap_or(0);
        if new_depth + deepest > self.hierarchy.max_depth {
            return Err(AppError::validation(format!(
                "Move would place folders at depth {}, above the limit of {}",
                new_depth + deepest,
                self.hierarchy.max_depth
            )));
        }

        let old_ancestors = snap.ancestors(folder.id)?;
        let new_ancestors = match target_record {
            Some(parent) => {
                let mut chain = vec![parent.id];
                chain.extend(snap.ancestors(parent.id)?);
                chain
            }
            None => Vec::new(),
        };

        let new_prefix = match target_record {
            Some(parent) => path::child_path(&parent.path, folder.id),
            None => path::root_path(folder.id),
        };
        let shift = new_depth - folder.depth;

        let mut upserts = Vec::with_capacity(subtree.len() + old_ancestors.len());
        let mut moved = folder.clone();
        for record in &subtree {
            let mut updated = (*record).clone();
            updated.path = path::rebase(&record.path, &folder.path, &new_prefix).ok_or_else(|| {
                AppError::internal(format!("Folder {} is not below {}", record.id, folder.id))
            })?;
            updated.depth += shift;
            updated.updated_at = now;
            if updated.id == folder.id {
                updated.parent_id = target;
                moved = updated.clone();
            }
            upserts.push(updated);
        }

        let stats = folder.stats();
        let mut deltas: BTreeMap<FolderId, FileStats> = BTreeMap::new();
        for id in &old_ancestors {
            *deltas.entry(*id).or_default() -= stats;
        }
        for id in &new_ancestors {
            *deltas.entry(*id).or_default() += stats;
        }
        for (id, delta) in deltas {
            if delta.is_zero() {
                continue;
            }
            let Some(record) = snap.get(id) else {
                continue;
            };
            let adjusted = record.stats().checked_add(delta).ok_or_else(|| {
                AppError::validation(format!(
                    "Move would overflow the statistics of folder '{}'",
                    record.name
                ))
            })?;
            let mut updated = record.clone();
            updated.set_stats(adjusted);
            updated.updated_at = now;
            upserts.push(updated);
        }

        Ok(MovePlan {
            folder: moved,
            from_parent: folder.parent_id,
            changes: FolderChanges::upsert(upserts),
            descendants_rewritten: subtree.len().saturating_sub(1),
            no_op: false,
        })
    }

    fn reject_cycle(&self, snap: &FolderSnapshot, folder: &Folder, parent: &Folder) -> AppResult<()> {
        if parent.id == folder.id {
            return Err(AppError::cyclic_move(format!(
                "Cannot move folder '{}' into itself",
                folder.name
            )));
        }

        let mut seen = std::collections::HashSet::from([parent.id]);
        let mut current = parent.parent_id;
        while let Some(id) = current {
            if id == folder.id {
                return Err(AppError::cyclic_move(format!(
                    "Cannot move folder '{}' into its own descendant '{}'",
                    folder.name, parent.name
                )));
            }
            if !seen.insert(id) {
                return Err(AppError::structural_integrity(format!(
                    "Parent chain of folder {} loops at {id}",
                    parent.id
                )));
            }
            let record = snap.get(id).ok_or_else(|| {
                AppError::structural_integrity(format!(
                    "Ancestor {id} of folder {} is missing",
                    parent.id
                ))
            })?;
            current = record.parent_id;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahub_core::ErrorKind;
    use mediahub_core::types::UserId;

    const OWNER: UserId = UserId::from_u128(100);

    fn engine() -> MoveEngine {
        MoveEngine::new(HierarchyConfig::default())
    }

    fn id(n: u128) -> FolderId {
        FolderId::from_u128(n)
    }

    fn input(records: &[Folder], siblings: &[Folder]) -> MoveInput {
        MoveInput {
            snapshot: FolderSnapshot::new(records.to_vec()),
            siblings: siblings.to_vec(),
        }
    }

    fn find(plan: &MovePlan, folder_id: FolderId) -> &Folder {
        plan.changes
            .upserts
            .iter()
            .find(|f| f.id == folder_id)
            .expect("folder in plan")
    }

    #[test]
    fn test_move_into_descendant_is_cyclic() {
        let root = Folder::new(id(1), OWNER, None, "root", 0);
        let a = Folder::new(id(2), OWNER, Some(&root), "A", 0);
        let b = Folder::new(id(3), OWNER, Some(&a), "B", 0);

        let err = engine()
            .plan(&input(&[root, a, b.clone()], &[]), id(2), Some(id(3)), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CyclicMove);

        let err = engine()
            .plan(&input(&[b], &[]), id(3), Some(id(3)), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CyclicMove);
    }

    #[test]
    fn test_move_root_under_other_root() {
        let root = Folder::new(id(1), OWNER, None, "root", 0);
        let c = Folder::new(id(2), OWNER, None, "C", 1);

        let plan = engine()
            .plan(&input(&[root.clone(), c], &[]), id(2), Some(id(1)), Utc::now())
            .unwrap();

        assert_eq!(plan.folder.path, format!("/{}/{}", id(1), id(2)));
        assert_eq!(plan.folder.depth, 1);
        assert_eq!(plan.folder.parent_id, Some(root.id));
        assert_eq!(plan.from_parent, None);
    }

    #[test]
    fn test_subtree_paths_and_stats_shift() {
        let root = Folder::new(id(1), OWNER, None, "root", 0);
        let mut src = Folder::new(id(2), OWNER, Some(&root), "src", 0);
        let mut a = Folder::new(id(3), OWNER, Some(&src), "A", 0);
        let b = Folder::new(id(4), OWNER, Some(&a), "B", 0);
        let mut dst = Folder::new(id(5), OWNER, Some(&root), "dst", 1);
        let mut root = root;
        a.set_stats(FileStats::new(3, 300));
        src.set_stats(FileStats::new(4, 400));
        dst.set_stats(FileStats::new(1, 10));
        root.set_stats(FileStats::new(5, 410));

        let plan = engine()
            .plan(
                &input(&[root.clone(), src, a.clone(), b.clone(), dst.clone()], &[]),
                a.id,
                Some(dst.id),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(plan.descendants_rewritten, 1);
        let moved_b = find(&plan, b.id);
        assert_eq!(moved_b.path, format!("{}/{}/{}", dst.path, a.id, b.id));
        assert_eq!(moved_b.depth, 3);
        assert_eq!(find(&plan, id(2)).stats(), FileStats::new(1, 100));
        assert_eq!(find(&plan, dst.id).stats(), FileStats::new(4, 310));
        assert!(plan.changes.upserts.iter().all(|f| f.id != root.id));
    }

    #[test]
    fn test_stats_overflow_is_rejected() {
        let root = Folder::new(id(1), OWNER, None, "root", 0);
        let mut a = Folder::new(id(2), OWNER, Some(&root), "A", 0);
        let mut dst = Folder::new(id(3), OWNER, Some(&root), "dst", 1);
        a.set_stats(FileStats::new(3, 300));
        dst.set_stats(FileStats::new(1, i64::MAX));

        let err = engine()
            .plan(&input(&[root, a.clone(), dst.clone()], &[]), a.id, Some(dst.id), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_duplicate_name_and_depth_limit() {
        let root = Folder::new(id(1), OWNER, None, "root", 0);
        let x = Folder::new(id(2), OWNER, Some(&root), "Photos", 0);
        let dst = Folder::new(id(3), OWNER, Some(&root), "dst", 1);
        let clash = Folder::new(id(4), OWNER, Some(&dst), "PHOTOS", 0);

        let err = engine()
            .plan(
                &input(&[root.clone(), x.clone(), dst.clone()], &[clash]),
                x.id,
                Some(dst.id),
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateName);

        let shallow = MoveEngine::new(HierarchyConfig {
            max_depth: 1,
            ..HierarchyConfig::default()
        });
        let err = shallow
            .plan(&input(&[root, x.clone(), dst.clone()], &[]), x.id, Some(dst.id), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_move_to_current_parent_is_no_op() {
        let root = Folder::new(id(1), OWNER, None, "root", 0);
        let a = Folder::new(id(2), OWNER, Some(&root), "A", 0);

        let plan = engine()
            .plan(&input(&[root.clone(), a.clone()], &[a.clone()]), a.id, Some(root.id), Utc::now())
            .unwrap();
        assert!(plan.no_op);
        assert!(plan.changes.is_empty());
        assert_eq!(plan.folder, a);
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let root = Folder::new(id(1), OWNER, None, "root", 0);
        let err = engine()
            .plan(&input(&[root.clone()], &[]), id(9), Some(root.id), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = engine()
            .plan(&input(&[root.clone()], &[]), root.id, Some(id(9)), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_broken_target_chain_is_structural() {
        let root = Folder::new(id(1), OWNER, None, "root", 0);
        let a = Folder::new(id(2), OWNER, Some(&root), "A", 0);
        let lost_parent = Folder::new(id(7), OWNER, None, "lost", 0);
        let target = Folder::new(id(3), OWNER, Some(&lost_parent), "T", 0);

        let err = engine()
            .plan(&input(&[root, a.clone(), target.clone()], &[]), a.id, Some(target.id), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralIntegrity);
    }
}
