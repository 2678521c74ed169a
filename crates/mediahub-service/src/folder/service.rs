//! Folder CRUD, move, and statistics operations with ACL enforcement.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use mediahub_auth::PermissionResolver;
use mediahub_core::config::HierarchyConfig;
use mediahub_core::error::AppError;
use mediahub_core::events::{DomainEvent, FolderEvent, PermissionEvent};
use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, UserId};
use mediahub_database::{FolderChanges, FolderFilter, FolderStore};
use mediahub_entity::folder::{FileStats, Folder, Visibility};
use mediahub_entity::permission::{FolderPermission, PermissionLevel};

use crate::cache::TreeCache;
use crate::context::RequestContext;
use crate::events::EventPublisher;
use crate::lock::TreeLockManager;

use super::movement::MoveEngine;
use super::snapshot::FolderSnapshot;

/// Request to create a new folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Parent folder ID (None for a root folder in the caller's library).
    pub parent_id: Option<FolderId>,
    /// Folder name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Display color.
    #[validate(length(max = 32))]
    pub color: Option<String>,
    /// Display icon.
    #[validate(length(max = 64))]
    pub icon: Option<String>,
    /// Free-form description.
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Default access policy; private when omitted.
    pub visibility: Option<Visibility>,
}

/// Request to update folder metadata.
///
/// `Some(None)` clears an optional field; `None` leaves it unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFolderRequest {
    /// New display color.
    pub color: Option<Option<String>>,
    /// New display icon.
    pub icon: Option<Option<String>>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New visibility; changing it requires `Admin`.
    pub visibility: Option<Visibility>,
    /// New position among siblings.
    pub sort_order: Option<i32>,
}

/// Manages folder records.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Folder store.
    store: Arc<dyn FolderStore>,
    /// Permission resolver.
    resolver: Arc<PermissionResolver>,
    /// Per-tree write locks.
    locks: TreeLockManager,
    /// Tree cache, invalidated after every write.
    cache: TreeCache,
    /// Event publisher.
    events: EventPublisher,
    /// Move validation and planning.
    engine: MoveEngine,
    /// Tree shape limits.
    hierarchy: HierarchyConfig,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        store: Arc<dyn FolderStore>,
        resolver: Arc<PermissionResolver>,
        locks: TreeLockManager,
        cache: TreeCache,
        events: EventPublisher,
        hierarchy: HierarchyConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            locks,
            cache,
            events,
            engine: MoveEngine::new(hierarchy.clone()),
            hierarchy,
        }
    }

    /// Gets a folder by ID.
    pub async fn get_folder(&self, ctx: &RequestContext, folder_id: FolderId) -> AppResult<Folder> {
        let folder = self.find(folder_id).await?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::View)
            .await?;
        debug!(folder_id = %folder_id, "Folder read");
        Ok(folder)
    }

    /// Creates a new folder.
    ///
    /// A root folder may be created by anyone in their own library; a child
    /// needs `Edit` on the parent. The creator receives an `Admin` grant in
    /// the same commit.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        req: CreateFolderRequest,
    ) -> AppResult<Folder> {
        req.validate()
            .map_err(|e| AppError::validation(format!("Invalid folder request: {e}")))?;
        let name = self.clean_name(&req.name)?;

        let _guard = match req.parent_id {
            Some(parent_id) => {
                self.locks
                    .lock_folders(self.store.as_ref(), &[parent_id], &[])
                    .await?
            }
            None => {
                self.locks
                    .lock_folders(self.store.as_ref(), &[], &[ctx.user_id])
                    .await?
            }
        };

        let parent = match req.parent_id {
            Some(parent_id) => Some(
                self.store
                    .get_folder(parent_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Parent folder not found"))?,
            ),
            None => None,
        };

        if let Some(parent) = &parent {
            self.resolver
                .require(ctx.user_id, parent, PermissionLevel::Edit)
                .await?;
            if parent.depth + 1 > self.hierarchy.max_depth {
                return Err(AppError::validation(format!(
                    "Folders cannot be nested deeper than {} levels",
                    self.hierarchy.max_depth
                )));
            }
        }

        let siblings = self.siblings_of(parent.as_ref().map(|p| p.id), ctx.user_id).await?;
        self.ensure_unique_name(&siblings, &name, None)?;
        let sort_order = match siblings.iter().map(|s| s.sort_order).max() {
            None => 0,
            Some(max) => max.checked_add(1).ok_or_else(|| {
                AppError::validation(
                    "No sort position left after the last sibling; lower a sibling's sort order first",
                )
            })?,
        };

        let mut folder = Folder::new(FolderId::new(), ctx.user_id, parent.as_ref(), name, sort_order);
        folder.color = req.color;
        folder.icon = req.icon;
        folder.description = req.description;
        folder.visibility = req.visibility.unwrap_or_default();

        let grant = FolderPermission::new(
            folder.id,
            ctx.user_id,
            PermissionLevel::Admin,
            ctx.user_id,
            None,
        );
        self.store
            .commit(FolderChanges::upsert(vec![folder.clone()]).with_grant(grant.clone()))
            .await?;
        self.cache.invalidate_all();

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder.id,
            parent_id = ?folder.parent_id,
            name = %folder.name,
            "Folder created"
        );

        self.events
            .publish(DomainEvent::folder(
                ctx.user_id,
                FolderEvent::Created {
                    folder_id: folder.id,
                    parent_id: folder.parent_id,
                    name: folder.name.clone(),
                },
            ))
            .await;
        self.events
            .publish(DomainEvent::permission(
                ctx.user_id,
                PermissionEvent::Granted {
                    permission_id: grant.id,
                    folder_id: folder.id,
                    user_id: ctx.user_id,
                    level: grant.level.to_string(),
                    expires_at: None,
                },
            ))
            .await;

        Ok(folder)
    }

    /// Renames a folder. Requires `Edit`.
    pub async fn rename_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        new_name: &str,
    ) -> AppResult<Folder> {
        let name = self.clean_name(new_name)?;
        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &[folder_id], &[])
            .await?;

        let mut folder = self.find(folder_id).await?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::Edit)
            .await?;

        if folder.name == name {
            return Ok(folder);
        }

        let siblings = self.siblings_of(folder.parent_id, folder.owner_id).await?;
        self.ensure_unique_name(&siblings, &name, Some(folder.id))?;

        let old_name = std::mem::replace(&mut folder.name, name);
        folder.updated_at = Utc::now();
        self.store.save_folder(&folder).await?;
        self.cache.invalidate_all();

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            new_name = %folder.name,
            "Folder renamed"
        );

        self.events
            .publish(DomainEvent::folder(
                ctx.user_id,
                FolderEvent::Renamed {
                    folder_id,
                    old_name,
                    new_name: folder.name.clone(),
                },
            ))
            .await;

        Ok(folder)
    }

    /// Updates display metadata. Requires `Edit`, or `Admin` when the
    /// visibility changes.
    pub async fn update_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        req: UpdateFolderRequest,
    ) -> AppResult<Folder> {
        check_optional_length("color", &req.color, 32)?;
        check_optional_length("icon", &req.icon, 64)?;
        check_optional_length("description", &req.description, 2000)?;

        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &[folder_id], &[])
            .await?;

        let mut folder = self.find(folder_id).await?;
        let required = match req.visibility {
            Some(visibility) if visibility != folder.visibility => PermissionLevel::Admin,
            _ => PermissionLevel::Edit,
        };
        self.resolver.require(ctx.user_id, &folder, required).await?;

        if let Some(color) = req.color {
            folder.color = color;
        }
        if let Some(icon) = req.icon {
            folder.icon = icon;
        }
        if let Some(description) = req.description {
            folder.description = description;
        }
        if let Some(visibility) = req.visibility {
            folder.visibility = visibility;
        }
        if let Some(sort_order) = req.sort_order {
            folder.sort_order = sort_order;
        }
        folder.updated_at = Utc::now();

        self.store.save_folder(&folder).await?;
        self.cache.invalidate_all();

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            visibility = %folder.visibility,
            "Folder updated"
        );

        self.events
            .publish(DomainEvent::folder(ctx.user_id, FolderEvent::Updated { folder_id }))
            .await;

        Ok(folder)
    }

    /// Moves a folder under a new parent, or to the root of its owner's
    /// library when `target` is `None`.
    ///
    /// Requires `Edit` on the folder and on the new parent; moving to the
    /// root level requires `Admin` on the folder.
    pub async fn move_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        target: Option<FolderId>,
    ) -> AppResult<Folder> {
        let owner = self.find(folder_id).await?.owner_id;
        let touched: Vec<FolderId> = std::iter::once(folder_id).chain(target).collect();
        let libraries = if target.is_none() { vec![owner] } else { Vec::new() };
        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &touched, &libraries)
            .await?;

        let input = self.engine.load(self.store.as_ref(), folder_id, target).await?;

        let folder = input
            .snapshot
            .get(folder_id)
            .ok_or_else(|| AppError::not_found("Folder not found"))?;
        match target {
            Some(target_id) => {
                let parent = input
                    .snapshot
                    .get(target_id)
                    .ok_or_else(|| AppError::not_found("Target folder not found"))?;
                self.resolver
                    .require(ctx.user_id, folder, PermissionLevel::Edit)
                    .await?;
                self.resolver
                    .require(ctx.user_id, parent, PermissionLevel::Edit)
                    .await?;
            }
            None => {
                self.resolver
                    .require(ctx.user_id, folder, PermissionLevel::Admin)
                    .await?;
            }
        }

        let planned = self.engine.plan(&input, folder_id, target, Utc::now());
        let plan = self.events.check("move_folder", &touched, planned).await?;
        if plan.no_op {
            debug!(folder_id = %folder_id, "Folder already under target, nothing to move");
            return Ok(plan.folder);
        }

        let records = plan.changes.upserts.len();
        self.store.commit(plan.changes).await?;
        self.cache.invalidate_all();

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            from_parent = ?plan.from_parent,
            to_parent = ?target,
            descendants = plan.descendants_rewritten,
            records,
            "Folder moved"
        );

        self.events
            .publish(DomainEvent::folder(
                ctx.user_id,
                FolderEvent::Moved {
                    folder_id,
                    from_parent_id: plan.from_parent,
                    to_parent_id: target,
                    descendants_rewritten: plan.descendants_rewritten,
                },
            ))
            .await;

        Ok(plan.folder)
    }

    /// Deletes a folder, every descendant, and every grant on them.
    ///
    /// Requires `Delete`. The subtree's statistics are subtracted from the
    /// remaining ancestors in the same commit. Returns the number of folders
    /// removed.
    pub async fn delete_folder(&self, ctx: &RequestContext, folder_id: FolderId) -> AppResult<usize> {
        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &[folder_id], &[])
            .await?;

        let folder = self.find(folder_id).await?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::Delete)
            .await?;

        let subtree = self
            .store
            .list_folders(FolderFilter::Subtree(folder_id))
            .await?;
        let deletes: Vec<FolderId> = subtree.iter().map(|f| f.id).collect();

        let mut snapshot = FolderSnapshot::new(subtree);
        snapshot.insert(folder.clone());
        snapshot.load_ancestry(self.store.as_ref(), folder_id).await?;
        let ancestors = self
            .events
            .check("delete_folder", &[folder_id], snapshot.ancestors(folder_id))
            .await?;

        let now = Utc::now();
        let removed = folder.stats();
        let upserts = ancestors
            .iter()
            .filter(|_| !removed.is_zero())
            .filter_map(|id| snapshot.get(*id))
            .map(|ancestor| {
                let stats = ancestor.stats().checked_sub(removed).ok_or_else(|| {
                    AppError::validation(format!(
                        "Statistics of folder '{}' are out of range",
                        ancestor.name
                    ))
                })?;
                let mut updated = ancestor.clone();
                updated.set_stats(stats);
                updated.updated_at = now;
                Ok(updated)
            })
            .collect::<AppResult<Vec<Folder>>>()?;

        let count = deletes.len();
        self.store
            .commit(FolderChanges {
                upserts,
                deletes,
                ..FolderChanges::default()
            })
            .await?;
        self.cache.invalidate_all();

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            removed = count,
            "Folder deleted"
        );

        self.events
            .publish(DomainEvent::folder(
                ctx.user_id,
                FolderEvent::Deleted {
                    folder_id,
                    removed_folders: count,
                },
            ))
            .await;

        Ok(count)
    }

    /// Applies a change in the folder's direct files to its direct
    /// statistics, its aggregates, and every ancestor's aggregates, in one
    /// commit. Requires `Upload`.
    pub async fn record_file_change(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        delta: FileStats,
    ) -> AppResult<Folder> {
        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &[folder_id], &[])
            .await?;

        let folder = self.find(folder_id).await?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::Upload)
            .await?;
        if delta.is_zero() {
            return Ok(folder);
        }

        let direct = self
            .store
            .direct_file_stats(&[folder_id])
            .await?
            .remove(&folder_id)
            .unwrap_or_default();
        adjusted_stats(&folder, direct.checked_add(delta))?;

        let mut snapshot = FolderSnapshot::new([folder.clone()]);
        snapshot.load_ancestry(self.store.as_ref(), folder_id).await?;
        let ancestors = self
            .events
            .check("record_file_change", &[folder_id], snapshot.ancestors(folder_id))
            .await?;

        let now = Utc::now();
        let mut upserts = Vec::with_capacity(ancestors.len() + 1);
        for id in std::iter::once(folder_id).chain(ancestors) {
            let Some(record) = snapshot.get(id) else {
                continue;
            };
            let stats = adjusted_stats(record, record.stats().checked_add(delta))?;
            let mut updated = record.clone();
            updated.set_stats(stats);
            updated.updated_at = now;
            upserts.push(updated);
        }

        let updated = upserts.first().cloned().unwrap_or(folder);
        self.store
            .commit(FolderChanges::upsert(upserts).with_direct_delta(folder_id, delta))
            .await?;
        self.cache.invalidate_all();

        debug!(
            folder_id = %folder_id,
            file_delta = delta.file_count,
            size_delta = delta.total_size,
            "Folder statistics updated"
        );

        self.events
            .publish(DomainEvent::folder(
                ctx.user_id,
                FolderEvent::StatsChanged {
                    folder_id,
                    file_delta: delta.file_count,
                    size_delta: delta.total_size,
                },
            ))
            .await;

        Ok(updated)
    }

    async fn find(&self, folder_id: FolderId) -> AppResult<Folder> {
        self.store
            .get_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))
    }

    async fn siblings_of(
        &self,
        parent_id: Option<FolderId>,
        owner: UserId,
    ) -> AppResult<Vec<Folder>> {
        let filter = match parent_id {
            Some(parent_id) => FolderFilter::Children(parent_id),
            None => FolderFilter::Roots(owner),
        };
        self.store.list_folders(filter).await
    }

    fn ensure_unique_name(
        &self,
        siblings: &[Folder],
        name: &str,
        except: Option<FolderId>,
    ) -> AppResult<()> {
        let key = self.hierarchy.name_key(name);
        let taken = siblings
            .iter()
            .any(|s| Some(s.id) != except && self.hierarchy.name_key(&s.name) == key);
        if taken {
            return Err(AppError::duplicate_name(format!(
                "A folder named '{name}' already exists here"
            )));
        }
        Ok(())
    }

    fn clean_name(&self, name: &str) -> AppResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Folder name cannot be empty"));
        }
        if trimmed.chars().count() > self.hierarchy.max_name_length {
            return Err(AppError::validation(format!(
                "Folder name is longer than {} characters",
                self.hierarchy.max_name_length
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(AppError::validation(
                "Folder name cannot contain control characters",
            ));
        }
        Ok(trimmed.to_string())
    }
}

/// Statistics after a file change, rejecting overflow and negative totals.
fn adjusted_stats(record: &Folder, stats: Option<FileStats>) -> AppResult<FileStats> {
    match stats {
        Some(stats) if !stats.is_negative() => Ok(stats),
        Some(_) => Err(AppError::validation(format!(
            "File change would make the statistics of folder '{}' negative",
            record.name
        ))),
        None => Err(AppError::validation(format!(
            "File change would overflow the statistics of folder '{}'",
            record.name
        ))),
    }
}

fn check_optional_length(field: &str, value: &Option<Option<String>>, max: usize) -> AppResult<()> {
    match value {
        Some(Some(v)) if v.chars().count() > max => Err(AppError::validation(format!(
            "Folder {field} is longer than {max} characters"
        ))),
        _ => Ok(()),
    }
}
