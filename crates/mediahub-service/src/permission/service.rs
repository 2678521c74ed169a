//! Folder grant management: grant, update, revoke, list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mediahub_auth::PermissionResolver;
use mediahub_core::error::AppError;
use mediahub_core::events::{DomainEvent, PermissionEvent};
use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, PermissionId, UserId};
use mediahub_database::{FolderStore, UserDirectory};
use mediahub_entity::folder::Folder;
use mediahub_entity::permission::{FolderPermission, PermissionLevel};

use crate::context::RequestContext;
use crate::events::EventPublisher;
use crate::lock::TreeLockManager;

/// Request to grant a user access to a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantRequest {
    /// Folder to grant on.
    pub folder_id: FolderId,
    /// Grantee.
    pub user_id: UserId,
    /// Granted level.
    pub level: PermissionLevel,
    /// Optional expiry. A past instant is stored as an already-expired grant.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request to change an existing grant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGrantRequest {
    /// New level.
    pub level: Option<PermissionLevel>,
    /// New expiry; `Some(None)` removes the expiry.
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

/// Manages per-folder grants.
#[derive(Debug, Clone)]
pub struct PermissionService {
    /// Folder and grant store.
    store: Arc<dyn FolderStore>,
    /// Known users.
    users: Arc<dyn UserDirectory>,
    /// Permission resolver.
    resolver: Arc<PermissionResolver>,
    /// Per-tree write locks.
    locks: TreeLockManager,
    /// Event publisher.
    events: EventPublisher,
}

impl PermissionService {
    /// Creates a new permission service.
    pub fn new(
        store: Arc<dyn FolderStore>,
        users: Arc<dyn UserDirectory>,
        resolver: Arc<PermissionResolver>,
        locks: TreeLockManager,
        events: EventPublisher,
    ) -> Self {
        Self {
            store,
            users,
            resolver,
            locks,
            events,
        }
    }

    /// Lists every grant on a folder, expired ones included. Requires `Admin`.
    pub async fn list_grants(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<Vec<FolderPermission>> {
        let folder = self.find_folder(folder_id).await?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::Admin)
            .await?;
        self.store.list_permissions(folder_id).await
    }

    /// Grants a user a level on a folder. Requires `Admin`.
    ///
    /// A user holds at most one grant per folder: granting again replaces
    /// the level and expiry of the existing grant.
    pub async fn grant(&self, ctx: &RequestContext, req: GrantRequest) -> AppResult<FolderPermission> {
        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &[req.folder_id], &[])
            .await?;

        let folder = self.find_folder(req.folder_id).await?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::Admin)
            .await?;

        if !self.users.user_exists(req.user_id).await? {
            return Err(AppError::not_found(format!("User {} not found", req.user_id)));
        }

        let now = Utc::now();
        let grants = self.store.list_permissions(req.folder_id).await?;
        let grant = match grants.iter().find(|g| g.user_id == req.user_id) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.level = req.level;
                updated.expires_at = req.expires_at;
                updated.granted_by = ctx.user_id;
                updated.granted_at = now;
                ensure_admin_remains(&grants, existing, Some(&updated), now)?;
                updated
            }
            None => FolderPermission::new(
                req.folder_id,
                req.user_id,
                req.level,
                ctx.user_id,
                req.expires_at,
            ),
        };
        self.store.save_permission(&grant).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %grant.folder_id,
            grantee = %grant.user_id,
            level = %grant.level,
            expires_at = ?grant.expires_at,
            "Folder permission granted"
        );

        self.events
            .publish(DomainEvent::permission(
                ctx.user_id,
                PermissionEvent::Granted {
                    permission_id: grant.id,
                    folder_id: grant.folder_id,
                    user_id: grant.user_id,
                    level: grant.level.to_string(),
                    expires_at: grant.expires_at,
                },
            ))
            .await;

        Ok(grant)
    }

    /// Changes the level or expiry of a grant. Requires `Admin` on its folder.
    pub async fn update_grant(
        &self,
        ctx: &RequestContext,
        permission_id: PermissionId,
        req: UpdateGrantRequest,
    ) -> AppResult<FolderPermission> {
        let folder_id = self
            .store
            .get_permission(permission_id)
            .await?
            .ok_or_else(|| AppError::not_found("Permission not found"))?
            .folder_id;
        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &[folder_id], &[])
            .await?;

        let existing = self
            .store
            .get_permission(permission_id)
            .await?
            .ok_or_else(|| AppError::not_found("Permission not found"))?;
        let folder = self.find_folder(existing.folder_id).await?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::Admin)
            .await?;

        let mut updated = existing.clone();
        if let Some(level) = req.level {
            updated.level = level;
        }
        if let Some(expires_at) = req.expires_at {
            updated.expires_at = expires_at;
        }

        let now = Utc::now();
        let grants = self.store.list_permissions(existing.folder_id).await?;
        ensure_admin_remains(&grants, &existing, Some(&updated), now)?;
        self.store.save_permission(&updated).await?;

        info!(
            user_id = %ctx.user_id,
            permission_id = %permission_id,
            level = %updated.level,
            expires_at = ?updated.expires_at,
            "Folder permission updated"
        );

        self.events
            .publish(DomainEvent::permission(
                ctx.user_id,
                PermissionEvent::Updated {
                    permission_id,
                    level: updated.level.to_string(),
                    expires_at: updated.expires_at,
                },
            ))
            .await;

        Ok(updated)
    }

    /// Removes a grant. Requires `Admin` on its folder.
    ///
    /// Revoking a grant that does not exist succeeds and returns `false`.
    pub async fn revoke(&self, ctx: &RequestContext, permission_id: PermissionId) -> AppResult<bool> {
        let Some(grant) = self.store.get_permission(permission_id).await? else {
            debug!(permission_id = %permission_id, "Permission already revoked");
            return Ok(false);
        };
        let _guard = self
            .locks
            .lock_folders(self.store.as_ref(), &[grant.folder_id], &[])
            .await?;

        let Some(grant) = self.store.get_permission(permission_id).await? else {
            return Ok(false);
        };
        let folder = self.find_folder(grant.folder_id).await?;
        self.resolver
            .require(ctx.user_id, &folder, PermissionLevel::Admin)
            .await?;

        let grants = self.store.list_permissions(grant.folder_id).await?;
        ensure_admin_remains(&grants, &grant, None, Utc::now())?;

        let removed = self.store.delete_permission(permission_id).await?;
        if removed {
            info!(
                user_id = %ctx.user_id,
                permission_id = %permission_id,
                folder_id = %grant.folder_id,
                grantee = %grant.user_id,
                "Folder permission revoked"
            );

            self.events
                .publish(DomainEvent::permission(
                    ctx.user_id,
                    PermissionEvent::Revoked {
                        permission_id,
                        folder_id: grant.folder_id,
                        user_id: grant.user_id,
                    },
                ))
                .await;
        }

        Ok(removed)
    }

    async fn find_folder(&self, folder_id: FolderId) -> AppResult<Folder> {
        self.store
            .get_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))
    }
}

/// Rejects a change that would leave a folder with no live `Admin` grant
/// when it had one before.
fn ensure_admin_remains(
    grants: &[FolderPermission],
    before: &FolderPermission,
    after: Option<&FolderPermission>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let is_live_admin =
        |g: &FolderPermission| g.level == PermissionLevel::Admin && g.is_active_at(now);

    if !is_live_admin(before) || after.is_some_and(is_live_admin) {
        return Ok(());
    }

    let others = grants
        .iter()
        .filter(|g| g.id != before.id)
        .any(is_live_admin);
    if others {
        return Ok(());
    }

    Err(AppError::conflict(
        "A folder must keep at least one active Admin grant",
    ))
}
