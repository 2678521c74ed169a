//! Verification and repair of derived folder fields.
//!
//! Paths, depths, and aggregate statistics are denormalized from the parent
//! links and the direct file statistics. This service recomputes them for a
//! scope, reports every record that disagrees, and on request rewrites the
//! drifted records in one commit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mediahub_auth::PermissionResolver;
use mediahub_core::error::AppError;
use mediahub_core::events::{DomainEvent, FolderEvent};
use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, UserId};
use mediahub_database::{FolderChanges, FolderFilter, FolderStore};
use mediahub_entity::folder::{FileStats, Folder, FolderNode, path};
use mediahub_entity::permission::PermissionLevel;

use crate::cache::{TreeCache, TreeScope};
use crate::context::RequestContext;
use crate::events::EventPublisher;
use crate::lock::TreeLockManager;

use super::tree::{StructuralFault, TreeBuilder, TreeService};

/// What is wrong with one folder record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum IntegrityProblem {
    /// Stored path differs from the one implied by the parent chain.
    PathDrift {
        /// Path in the record.
        stored: String,
        /// Path derived from the parent chain.
        expected: String,
    },
    /// Stored depth differs from the parent chain length.
    DepthDrift {
        /// Depth in the record.
        stored: i32,
        /// Depth derived from the parent chain.
        expected: i32,
    },
    /// Stored aggregates differ from the sum over the subtree.
    StatsDrift {
        /// Aggregates in the record.
        stored: FileStats,
        /// Aggregates recomputed from direct statistics.
        expected: FileStats,
    },
    /// The record names a parent that does not exist.
    DanglingParent {
        /// The missing parent.
        parent_id: FolderId,
    },
    /// The record cannot be reached from any root (parent cycle).
    Unreachable,
    /// More than one record carries this id.
    DuplicateId,
}

impl IntegrityProblem {
    /// Whether the problem is a broken tree shape rather than stale
    /// derived data.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DanglingParent { .. } | Self::Unreachable | Self::DuplicateId
        )
    }
}

/// One finding of an integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    /// The affected folder.
    pub folder_id: FolderId,
    /// What is wrong with it.
    #[serde(flatten)]
    pub problem: IntegrityProblem,
}

/// Result of verifying (and possibly repairing) a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// The checked scope.
    pub scope: TreeScope,
    /// Number of folder records examined.
    pub folders_checked: usize,
    /// Every finding, in discovery order.
    pub issues: Vec<IntegrityIssue>,
    /// Number of records rewritten by a repair.
    pub repaired: usize,
}

impl IntegrityReport {
    fn new(scope: TreeScope, folders_checked: usize) -> Self {
        Self {
            scope,
            folders_checked,
            issues: Vec::new(),
            repaired: 0,
        }
    }

    /// Whether no issue was found.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Ids of folders with a structural problem.
    pub fn structural_ids(&self) -> Vec<FolderId> {
        self.issues
            .iter()
            .filter(|i| i.problem.is_structural())
            .map(|i| i.folder_id)
            .collect()
    }

    fn push(&mut self, folder_id: FolderId, problem: IntegrityProblem) {
        self.issues.push(IntegrityIssue { folder_id, problem });
    }
}

/// Verifies and repairs derived folder fields.
#[derive(Debug, Clone)]
pub struct IntegrityService {
    store: Arc<dyn FolderStore>,
    resolver: Arc<PermissionResolver>,
    trees: TreeService,
    locks: TreeLockManager,
    cache: TreeCache,
    events: EventPublisher,
}

impl IntegrityService {
    /// Creates a new integrity service.
    pub fn new(
        store: Arc<dyn FolderStore>,
        resolver: Arc<PermissionResolver>,
        trees: TreeService,
        locks: TreeLockManager,
        cache: TreeCache,
        events: EventPublisher,
    ) -> Self {
        Self {
            store,
            resolver,
            trees,
            locks,
            cache,
            events,
        }
    }

    /// Checks every record in the scope. Nothing is written.
    ///
    /// Readable by anyone who may read the scope's tree.
    pub async fn verify(&self, ctx: &RequestContext, scope: TreeScope) -> AppResult<IntegrityReport> {
        self.trees.authorize(ctx, scope).await?;
        let (report, _) = self.inspect(scope, Utc::now()).await?;
        self.report_findings("verify_integrity", &report).await;
        Ok(report)
    }

    /// Rewrites drifted paths, depths, and aggregates of every reachable
    /// record in the scope.
    ///
    /// Requires `Admin` on every root of the scope. Dangling parents, cycles
    /// and duplicate ids are reported but left untouched.
    pub async fn repair(&self, ctx: &RequestContext, scope: TreeScope) -> AppResult<IntegrityReport> {
        let (roots, libraries) = self.authorize_repair(ctx, scope).await?;
        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &roots, &libraries)
            .await?;

        let (mut report, fixes) = self.inspect(scope, Utc::now()).await?;
        self.report_findings("repair", &report).await;
        if fixes.is_empty() {
            return Ok(report);
        }

        let records = fixes.len();
        self.store.commit(FolderChanges::upsert(fixes)).await?;
        self.cache.invalidate_all();
        report.repaired = records;

        info!(
            user_id = %ctx.user_id,
            scope = ?scope,
            records,
            "Folder records repaired"
        );

        self.events
            .publish(DomainEvent::folder(ctx.user_id, FolderEvent::Repaired { records }))
            .await;

        Ok(report)
    }

    async fn authorize_repair(
        &self,
        ctx: &RequestContext,
        scope: TreeScope,
    ) -> AppResult<(Vec<FolderId>, Vec<UserId>)> {
        let (roots, libraries) = match scope {
            TreeScope::Library(owner) => {
                if owner != ctx.user_id {
                    return Err(AppError::permission_denied(
                        "Only the owner may repair a library",
                    ));
                }
                let roots = self.store.list_folders(FolderFilter::Roots(owner)).await?;
                (roots, vec![owner])
            }
            TreeScope::Subtree(id) => {
                let folder = self
                    .store
                    .get_folder(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Folder not found"))?;
                (vec![folder], Vec::new())
            }
        };

        for root in &roots {
            self.resolver
                .require(ctx.user_id, root, PermissionLevel::Admin)
                .await?;
        }
        Ok((roots.iter().map(|f| f.id).collect(), libraries))
    }

    async fn report_findings(&self, operation: &str, report: &IntegrityReport) {
        if report.is_clean() {
            return;
        }
        warn!(
            scope = ?report.scope,
            issues = report.issues.len(),
            "Folder records disagree with the hierarchy"
        );
        let structural = report.structural_ids();
        if !structural.is_empty() {
            let err = AppError::structural_integrity(format!(
                "{} folder(s) are detached from the hierarchy",
                structural.len()
            ));
            self.events
                .integrity_violation(operation, &err, structural)
                .await;
        }
    }

    /// Recomputes the scope and returns the findings plus corrected copies
    /// of every drifted reachable record.
    async fn inspect(
        &self,
        scope: TreeScope,
        now: DateTime<Utc>,
    ) -> AppResult<(IntegrityReport, Vec<Folder>)> {
        let (records, direct, anchors) = self.trees.load_scope(scope).await?;
        let mut report = IntegrityReport::new(scope, records.len());

        let forest = match TreeBuilder::build(&records, &direct, &anchors) {
            Ok(forest) => forest,
            Err(StructuralFault::DuplicateIds(ids)) => {
                for id in ids {
                    report.push(id, IntegrityProblem::DuplicateId);
                }
                return Ok((report, Vec::new()));
            }
            Err(StructuralFault::Unreachable(ids)) => {
                for id in &ids {
                    report.push(*id, IntegrityProblem::Unreachable);
                }
                let skip: HashSet<FolderId> = ids.into_iter().collect();
                let reachable: Vec<Folder> = records
                    .iter()
                    .filter(|f| !skip.contains(&f.id))
                    .cloned()
                    .collect();
                TreeBuilder::build(&reachable, &direct, &anchors).map_err(AppError::from)?
            }
        };

        let by_id: HashMap<FolderId, &Folder> = records.iter().map(|f| (f.id, f)).collect();
        let mut walk = Walk {
            by_id: &by_id,
            report: &mut report,
            fixes: Vec::new(),
            now,
        };
        for root in &forest.roots {
            let Some(record) = by_id.get(&root.id) else {
                continue;
            };
            let (expected_path, expected_depth) =
                self.root_placement(record, root, &anchors, walk.report).await?;
            walk.visit(root, expected_path, expected_depth);
        }
        let fixes = walk.fixes;

        Ok((report, fixes))
    }

    /// Where a forest root should sit.
    ///
    /// A true root sits at the top. A subtree anchor is placed under its
    /// stored parent. A record whose parent is missing keeps its stored
    /// placement as the base for its descendants.
    async fn root_placement(
        &self,
        record: &Folder,
        node: &FolderNode,
        anchors: &HashSet<FolderId>,
        report: &mut IntegrityReport,
    ) -> AppResult<(String, i32)> {
        let Some(parent_id) = record.parent_id else {
            return Ok((path::root_path(record.id), 0));
        };

        if anchors.contains(&record.id) {
            if let Some(parent) = self.store.get_folder(parent_id).await? {
                return Ok((path::child_path(&parent.path, record.id), parent.depth + 1));
            }
        } else if !node.dangling_parent {
            return Ok((record.path.clone(), record.depth));
        }

        report.push(record.id, IntegrityProblem::DanglingParent { parent_id });
        Ok((record.path.clone(), record.depth))
    }
}

struct Walk<'a> {
    by_id: &'a HashMap<FolderId, &'a Folder>,
    report: &'a mut IntegrityReport,
    fixes: Vec<Folder>,
    now: DateTime<Utc>,
}

impl Walk<'_> {
    fn visit(&mut self, node: &FolderNode, expected_path: String, expected_depth: i32) {
        for child in &node.children {
            self.visit(
                child,
                path::child_path(&expected_path, child.id),
                expected_depth + 1,
            );
        }

        let Some(record) = self.by_id.get(&node.id) else {
            return;
        };
        let mut fixed = (*record).clone();
        let mut drifted = false;

        if record.path != expected_path {
            self.report.push(
                record.id,
                IntegrityProblem::PathDrift {
                    stored: record.path.clone(),
                    expected: expected_path.clone(),
                },
            );
            fixed.path = expected_path;
            drifted = true;
        }
        if record.depth != expected_depth {
            self.report.push(
                record.id,
                IntegrityProblem::DepthDrift {
                    stored: record.depth,
                    expected: expected_depth,
                },
            );
            fixed.depth = expected_depth;
            drifted = true;
        }
        if record.stats() != node.stats() {
            self.report.push(
                record.id,
                IntegrityProblem::StatsDrift {
                    stored: record.stats(),
                    expected: node.stats(),
                },
            );
            fixed.set_stats(node.stats());
            drifted = true;
        }

        if drifted {
            fixed.updated_at = self.now;
            self.fixes.push(fixed);
        }
    }
}
