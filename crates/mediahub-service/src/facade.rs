//! Single entry point over the folder hierarchy services.

use std::sync::Arc;

use mediahub_auth::PermissionResolver;
use mediahub_core::config::AppConfig;
use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::traits::EventSink;
use mediahub_core::types::{FolderId, PermissionId, UserId};
use mediahub_database::{FolderStore, UserDirectory};
use mediahub_entity::folder::{FileStats, Folder, FolderForest};
use mediahub_entity::permission::{FolderPermission, PermissionLevel};

use crate::cache::{TreeCache, TreeScope};
use crate::context::RequestContext;
use crate::events::EventPublisher;
use crate::folder::{
    CreateFolderRequest, FolderService, IntegrityReport, IntegrityService, TreeService,
    UpdateFolderRequest,
};
use crate::lock::TreeLockManager;
use crate::permission::{GrantRequest, PermissionService, UpdateGrantRequest};

/// Wires the services over one store and exposes every folder operation.
///
/// Every write to the store goes through this type; callers never hold the
/// store directly once the façade is built.
#[derive(Debug, Clone)]
pub struct AccessFacade {
    store: Arc<dyn FolderStore>,
    resolver: Arc<PermissionResolver>,
    trees: TreeService,
    folders: FolderService,
    permissions: PermissionService,
    integrity: IntegrityService,
}

impl AccessFacade {
    /// Builds the services from configuration.
    pub fn new(
        store: Arc<dyn FolderStore>,
        users: Arc<dyn UserDirectory>,
        sink: Arc<dyn EventSink>,
        config: &AppConfig,
    ) -> Self {
        let resolver = Arc::new(PermissionResolver::new(
            Arc::clone(&store),
            config.permissions.clone(),
        ));
        let cache = TreeCache::new(&config.cache);
        let locks = TreeLockManager::new(config.locking.clone());
        let events = EventPublisher::new(sink);

        let trees = TreeService::new(
            Arc::clone(&store),
            Arc::clone(&resolver),
            cache.clone(),
            events.clone(),
        );
        let folders = FolderService::new(
            Arc::clone(&store),
            Arc::clone(&resolver),
            locks.clone(),
            cache.clone(),
            events.clone(),
            config.hierarchy.clone(),
        );
        let permissions = PermissionService::new(
            Arc::clone(&store),
            users,
            Arc::clone(&resolver),
            locks.clone(),
            events.clone(),
        );
        let integrity = IntegrityService::new(
            Arc::clone(&store),
            Arc::clone(&resolver),
            trees.clone(),
            locks,
            cache,
            events,
        );

        Self {
            store,
            resolver,
            trees,
            folders,
            permissions,
            integrity,
        }
    }

    // -- Trees --

    /// Builds the folder forest for a scope.
    pub async fn get_tree(
        &self,
        ctx: &RequestContext,
        scope: TreeScope,
    ) -> AppResult<Arc<FolderForest>> {
        self.trees.get_tree(ctx, scope).await
    }

    /// Chain of folders from the top-level root down to the folder.
    pub async fn breadcrumbs(&self, ctx: &RequestContext, folder_id: FolderId) -> AppResult<Vec<Folder>> {
        self.trees.get_breadcrumbs(ctx, folder_id).await
    }

    // -- Folders --

    /// Reads one folder.
    pub async fn get_folder(&self, ctx: &RequestContext, folder_id: FolderId) -> AppResult<Folder> {
        self.folders.get_folder(ctx, folder_id).await
    }

    /// Creates a folder.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        req: CreateFolderRequest,
    ) -> AppResult<Folder> {
        self.folders.create_folder(ctx, req).await
    }

    /// Renames a folder.
    pub async fn rename_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        new_name: &str,
    ) -> AppResult<Folder> {
        self.folders.rename_folder(ctx, folder_id, new_name).await
    }

    /// Updates display metadata or visibility.
    pub async fn update_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        req: UpdateFolderRequest,
    ) -> AppResult<Folder> {
        self.folders.update_folder(ctx, folder_id, req).await
    }

    /// Moves a folder under `target`, or to the root level when `None`.
    pub async fn move_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        target: Option<FolderId>,
    ) -> AppResult<Folder> {
        self.folders.move_folder(ctx, folder_id, target).await
    }

    /// Deletes a folder and its subtree; returns the number removed.
    pub async fn delete_folder(&self, ctx: &RequestContext, folder_id: FolderId) -> AppResult<usize> {
        self.folders.delete_folder(ctx, folder_id).await
    }

    /// Applies a change in a folder's direct files to the aggregates.
    pub async fn record_file_change(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        delta: FileStats,
    ) -> AppResult<Folder> {
        self.folders.record_file_change(ctx, folder_id, delta).await
    }

    // -- Grants --

    /// Grants access to a folder.
    pub async fn grant(&self, ctx: &RequestContext, req: GrantRequest) -> AppResult<FolderPermission> {
        self.permissions.grant(ctx, req).await
    }

    /// Changes a grant.
    pub async fn update_grant(
        &self,
        ctx: &RequestContext,
        permission_id: PermissionId,
        req: UpdateGrantRequest,
    ) -> AppResult<FolderPermission> {
        self.permissions.update_grant(ctx, permission_id, req).await
    }

    /// Revokes a grant; `false` when it did not exist.
    pub async fn revoke(&self, ctx: &RequestContext, permission_id: PermissionId) -> AppResult<bool> {
        self.permissions.revoke(ctx, permission_id).await
    }

    /// Lists the grants on a folder.
    pub async fn list_grants(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<Vec<FolderPermission>> {
        self.permissions.list_grants(ctx, folder_id).await
    }

    // -- Access checks --

    /// Whether the user holds at least `required` on the folder. A missing
    /// folder yields `false`.
    pub async fn check_access(
        &self,
        user_id: UserId,
        folder_id: FolderId,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        self.resolver.check_access(user_id, folder_id, required).await
    }

    /// The user's effective level on the folder under the configured
    /// inheritance mode.
    pub async fn effective_level(
        &self,
        user_id: UserId,
        folder_id: FolderId,
    ) -> AppResult<Option<PermissionLevel>> {
        let folder = self.find(folder_id).await?;
        self.resolver.effective_level(user_id, &folder).await
    }

    /// The user's effective level including grants on every ancestor.
    pub async fn effective_level_inherited(
        &self,
        user_id: UserId,
        folder_id: FolderId,
    ) -> AppResult<Option<PermissionLevel>> {
        let folder = self.find(folder_id).await?;
        self.resolver.effective_level_inherited(user_id, &folder).await
    }

    // -- Integrity --

    /// Reports drifted or detached records in a scope.
    pub async fn verify_integrity(
        &self,
        ctx: &RequestContext,
        scope: TreeScope,
    ) -> AppResult<IntegrityReport> {
        self.integrity.verify(ctx, scope).await
    }

    /// Rewrites drifted records in a scope.
    pub async fn repair(&self, ctx: &RequestContext, scope: TreeScope) -> AppResult<IntegrityReport> {
        self.integrity.repair(ctx, scope).await
    }

    async fn find(&self, folder_id: FolderId) -> AppResult<Folder> {
        self.store
            .get_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))
    }
}
