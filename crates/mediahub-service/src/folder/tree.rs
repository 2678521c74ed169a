//! Folder tree building and breadcrumb resolution.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use mediahub_auth::PermissionResolver;
use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::types::FolderId;
use mediahub_database::{FolderFilter, FolderStore};
use mediahub_entity::folder::{FileStats, Folder, FolderForest, FolderNode, path};
use mediahub_entity::permission::PermissionLevel;

use crate::cache::{TreeCache, TreeScope};
use crate::context::RequestContext;
use crate::events::EventPublisher;

/// Why a set of folder records could not be assembled into a forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralFault {
    /// The same id appears on more than one record.
    DuplicateIds(Vec<FolderId>),
    /// Records that no root reaches: members of a parent cycle and
    /// everything below them.
    Unreachable(Vec<FolderId>),
}

impl StructuralFault {
    /// Folders named by the fault, sorted.
    pub fn folder_ids(&self) -> &[FolderId] {
        match self {
            Self::DuplicateIds(ids) | Self::Unreachable(ids) => ids,
        }
    }
}

impl fmt::Display for StructuralFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (what, ids) = match self {
            Self::DuplicateIds(ids) => ("duplicate folder ids", ids),
            Self::Unreachable(ids) => ("folders unreachable from any root (parent cycle)", ids),
        };
        let list: Vec<String> = ids.iter().map(ToString::to_string).collect();
        write!(f, "{} {what}: {}", ids.len(), list.join(", "))
    }
}

impl From<StructuralFault> for AppError {
    fn from(fault: StructuralFault) -> Self {
        AppError::structural_integrity(fault.to_string())
    }
}

/// Assembles flat folder records into a sorted forest with recomputed
/// aggregate statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder;

impl TreeBuilder {
    /// Build a forest.
    ///
    /// A record whose parent is absent from `records` becomes a root with
    /// `dangling_parent` set, unless its id is in `anchors`. Aggregates are
    /// the record's direct stats plus its children's aggregates; the stored
    /// `file_count`/`total_size` are ignored.
    pub fn build(
        records: &[Folder],
        direct: &HashMap<FolderId, FileStats>,
        anchors: &HashSet<FolderId>,
    ) -> Result<FolderForest, StructuralFault> {
        let mut by_id: HashMap<FolderId, &Folder> = HashMap::with_capacity(records.len());
        let mut duplicates = BTreeSet::new();
        for folder in records {
            if by_id.insert(folder.id, folder).is_some() {
                duplicates.insert(folder.id);
            }
        }
        if !duplicates.is_empty() {
            return Err(StructuralFault::DuplicateIds(duplicates.into_iter().collect()));
        }

        let mut children: HashMap<FolderId, Vec<&Folder>> = HashMap::new();
        let mut roots: Vec<(&Folder, bool)> = Vec::new();
        for folder in records {
            let anchored = anchors.contains(&folder.id);
            match folder.parent_id {
                Some(parent) if by_id.contains_key(&parent) && !anchored => {
                    children.entry(parent).or_default().push(folder);
                }
                Some(_) => roots.push((folder, !anchored)),
                None => roots.push((folder, false)),
            }
        }

        roots.sort_by(|(a, _), (b, _)| display_order(a, b));
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| display_order(a, b));
        }

        let mut visited = HashSet::with_capacity(records.len());
        let nodes: Vec<FolderNode> = roots
            .into_iter()
            .map(|(folder, dangling)| attach(folder, dangling, &children, direct, &mut visited))
            .collect();

        if visited.len() != records.len() {
            let unreachable: BTreeSet<FolderId> = records
                .iter()
                .map(|f| f.id)
                .filter(|id| !visited.contains(id))
                .collect();
            return Err(StructuralFault::Unreachable(unreachable.into_iter().collect()));
        }

        Ok(FolderForest {
            roots: nodes,
            total_folders: visited.len() as u64,
        })
    }
}

/// Sibling display order: `sort_order`, then case-insensitive name, then id.
pub fn display_order(a: &Folder, b: &Folder) -> std::cmp::Ordering {
    a.sort_order
        .cmp(&b.sort_order)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then(a.id.cmp(&b.id))
}

fn attach(
    folder: &Folder,
    dangling_parent: bool,
    children: &HashMap<FolderId, Vec<&Folder>>,
    direct: &HashMap<FolderId, FileStats>,
    visited: &mut HashSet<FolderId>,
) -> FolderNode {
    visited.insert(folder.id);

    let kids: Vec<FolderNode> = children
        .get(&folder.id)
        .map(|list| {
            list.iter()
                .map(|child| attach(child, false, children, direct, visited))
                .collect()
        })
        .unwrap_or_default();

    let own = direct.get(&folder.id).copied().unwrap_or_default();
    let total = own + kids.iter().map(FolderNode::stats).sum::<FileStats>();

    FolderNode {
        id: folder.id,
        parent_id: folder.parent_id,
        name: folder.name.clone(),
        path: folder.path.clone(),
        depth: folder.depth,
        sort_order: folder.sort_order,
        color: folder.color.clone(),
        icon: folder.icon.clone(),
        visibility: folder.visibility,
        direct: own,
        file_count: total.file_count,
        total_size: total.total_size,
        dangling_parent,
        children: kids,
    }
}

/// Loads, builds, and caches folder trees.
#[derive(Debug, Clone)]
pub struct TreeService {
    /// Folder store.
    store: Arc<dyn FolderStore>,
    /// Permission resolver.
    resolver: Arc<PermissionResolver>,
    /// Built-forest cache.
    cache: TreeCache,
    /// Event publisher for integrity alerts.
    events: EventPublisher,
}

impl TreeService {
    /// Creates a new tree service.
    pub fn new(
        store: Arc<dyn FolderStore>,
        resolver: Arc<PermissionResolver>,
        cache: TreeCache,
        events: EventPublisher,
    ) -> Self {
        Self {
            store,
            resolver,
            cache,
            events,
        }
    }

    /// Builds the forest for a scope after checking the caller may read it.
    ///
    /// `Library(owner)` is only readable by the owner; `Subtree(id)` needs
    /// `View` on the subtree root.
    pub async fn get_tree(
        &self,
        ctx: &RequestContext,
        scope: TreeScope,
    ) -> AppResult<Arc<FolderForest>> {
        self.authorize(ctx, scope).await?;

        if let Some(forest) = self.cache.get(&scope).await {
            return Ok(forest);
        }

        let forest = Arc::new(self.build_scope(scope).await?);
        self.cache.insert(scope, Arc::clone(&forest)).await;
        Ok(forest)
    }

    /// Loads the records of a scope with their direct stats.
    pub async fn load_scope(
        &self,
        scope: TreeScope,
    ) -> AppResult<(Vec<Folder>, HashMap<FolderId, FileStats>, HashSet<FolderId>)> {
        let (filter, anchors) = match scope {
            TreeScope::Library(owner) => (FolderFilter::Library(owner), HashSet::new()),
            TreeScope::Subtree(id) => (FolderFilter::Subtree(id), HashSet::from([id])),
        };
        let records = self.store.list_folders(filter).await?;
        let ids: Vec<FolderId> = records.iter().map(|f| f.id).collect();
        let direct = self.store.direct_file_stats(&ids).await?;
        Ok((records, direct, anchors))
    }

    /// Builds the forest for a scope without permission checks or caching.
    pub async fn build_scope(&self, scope: TreeScope) -> AppResult<FolderForest> {
        let (records, direct, anchors) = self.load_scope(scope).await?;

        match TreeBuilder::build(&records, &direct, &anchors) {
            Ok(forest) => {
                debug!(
                    scope = ?scope,
                    folders = forest.total_folders,
                    orphans = forest.orphans().count(),
                    "Folder tree built"
                );
                Ok(forest)
            }
            Err(fault) => {
                let ids = fault.folder_ids().to_vec();
                let err = AppError::from(fault);
                self.events.integrity_violation("get_tree", &err, ids).await;
                Err(err)
            }
        }
    }

    /// Gets the chain of folders from the top-level root down to `folder_id`.
    pub async fn get_breadcrumbs(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<Vec<Folder>> {
        let folder = self
            .store
            .get_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::View)
            .await?;

        let result = self.resolve_chain(&folder).await;
        self.events
            .check("breadcrumbs", &[folder_id], result)
            .await
    }

    async fn resolve_chain(&self, folder: &Folder) -> AppResult<Vec<Folder>> {
        let chain = path::parse_path(&folder.path)?;
        let mut by_id: HashMap<FolderId, Folder> = self
            .store
            .get_folders(&chain)
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        let mut crumbs = Vec::with_capacity(chain.len());
        let mut expected_parent: Option<FolderId> = None;
        for id in chain {
            let record = by_id.remove(&id).ok_or_else(|| {
                AppError::structural_integrity(format!(
                    "Ancestor {id} of folder {} is missing",
                    folder.id
                ))
            })?;
            if record.parent_id != expected_parent {
                return Err(AppError::structural_integrity(format!(
                    "Folder {id} path disagrees with its parent link"
                )));
            }
            expected_parent = Some(record.id);
            crumbs.push(record);
        }
        Ok(crumbs)
    }

    pub(crate) async fn authorize(&self, ctx: &RequestContext, scope: TreeScope) -> AppResult<()> {
        match scope {
            TreeScope::Library(owner) if owner == ctx.user_id => Ok(()),
            TreeScope::Library(_) => Err(AppError::permission_denied(
                "Only the owner may read a library tree",
            )),
            TreeScope::Subtree(id) => {
                let folder = self
                    .store
                    .get_folder(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Folder not found"))?;
                self.resolver
                    .require(ctx.user_id, &folder, PermissionLevel::View)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahub_core::types::UserId;

    const OWNER: UserId = UserId::from_u128(100);

    fn folder(id: u128, parent: Option<&Folder>, name: &str, sort_order: i32) -> Folder {
        Folder::new(FolderId::from_u128(id), OWNER, parent, name, sort_order)
    }

    fn ids(nodes: &[FolderNode]) -> Vec<FolderId> {
        nodes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_aggregates_roll_up() {
        let root = folder(1, None, "Root", 0);
        let a = folder(2, Some(&root), "A", 0);
        let b = folder(3, Some(&a), "B", 0);
        let c = folder(4, Some(&root), "C", 1);
        let direct = HashMap::from([
            (root.id, FileStats::new(1, 10)),
            (b.id, FileStats::new(2, 200)),
            (c.id, FileStats::new(3, 30)),
        ]);

        let forest =
            TreeBuilder::build(&[root.clone(), a, b, c], &direct, &HashSet::new()).unwrap();

        assert_eq!(forest.total_folders, 4);
        let top = &forest.roots[0];
        assert_eq!(top.stats(), FileStats::new(6, 240));
        assert_eq!(top.direct, FileStats::new(1, 10));
        assert_eq!(top.children[0].stats(), FileStats::new(2, 200));
        assert_eq!(top.children[0].direct, FileStats::ZERO);
    }

    #[test]
    fn test_sibling_order() {
        let root = folder(1, None, "Root", 0);
        let z = folder(2, Some(&root), "zeta", 0);
        let a = folder(3, Some(&root), "Alpha", 0);
        let late = folder(4, Some(&root), "aardvark", 5);
        let forest = TreeBuilder::build(
            &[late.clone(), z.clone(), root, a.clone()],
            &HashMap::new(),
            &HashSet::new(),
        )
        .unwrap();

        assert_eq!(ids(&forest.roots[0].children), vec![a.id, z.id, late.id]);
    }

    #[test]
    fn test_missing_parent_flags_orphan() {
        let root = folder(1, None, "Root", 0);
        let child = folder(2, Some(&root), "Child", 0);
        let forest =
            TreeBuilder::build(&[child.clone()], &HashMap::new(), &HashSet::new()).unwrap();

        assert_eq!(forest.roots.len(), 1);
        assert!(forest.roots[0].dangling_parent);
        assert_eq!(forest.orphans().count(), 1);

        let anchored =
            TreeBuilder::build(&[child.clone()], &HashMap::new(), &HashSet::from([child.id]))
                .unwrap();
        assert!(!anchored.roots[0].dangling_parent);
    }

    #[test]
    fn test_cycle_is_structural_fault() {
        let root = folder(1, None, "Root", 0);
        let mut a = folder(2, Some(&root), "A", 0);
        let mut b = folder(3, Some(&a), "B", 0);
        let below = folder(4, Some(&b), "Below", 0);
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);

        let err = TreeBuilder::build(
            &[root, a.clone(), b.clone(), below.clone()],
            &HashMap::new(),
            &HashSet::new(),
        )
        .unwrap_err();

        assert_eq!(err, StructuralFault::Unreachable(vec![a.id, b.id, below.id]));
        let app: AppError = err.into();
        assert_eq!(app.kind, mediahub_core::ErrorKind::StructuralIntegrity);
    }

    #[test]
    fn test_self_parent_and_duplicates() {
        let mut selfish = folder(1, None, "Loop", 0);
        selfish.parent_id = Some(selfish.id);
        let err = TreeBuilder::build(&[selfish.clone()], &HashMap::new(), &HashSet::new())
            .unwrap_err();
        assert_eq!(err.folder_ids(), &[selfish.id]);

        let dup = folder(5, None, "Dup", 0);
        let err = TreeBuilder::build(&[dup.clone(), dup.clone()], &HashMap::new(), &HashSet::new())
            .unwrap_err();
        assert_eq!(err, StructuralFault::DuplicateIds(vec![dup.id]));
    }
}
