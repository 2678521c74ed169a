//! Explicit grant lookup against the folder store.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, UserId};
use mediahub_database::FolderStore;
use mediahub_entity::permission::{FolderPermission, PermissionLevel};

/// Reads a user's explicit grants on a single folder.
#[derive(Debug, Clone)]
pub struct AclChecker {
    /// Folder store holding the grants.
    store: Arc<dyn FolderStore>,
}

impl AclChecker {
    /// Creates a new ACL checker.
    pub fn new(store: Arc<dyn FolderStore>) -> Self {
        Self { store }
    }

    /// Gets the user's grants on a folder, expired ones included.
    pub async fn get_entries_for_user(
        &self,
        folder_id: FolderId,
        user_id: UserId,
    ) -> AppResult<Vec<FolderPermission>> {
        self.store
            .list_user_permissions(user_id, &[folder_id])
            .await
    }

    /// Returns the highest level among the user's live grants on the folder.
    pub async fn highest_level_at(
        &self,
        folder_id: FolderId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PermissionLevel>> {
        let entries = self.get_entries_for_user(folder_id, user_id).await?;
        Ok(highest_live(&entries, now))
    }
}

/// Highest level among grants that are live at `now`.
pub fn highest_live<'a>(
    grants: impl IntoIterator<Item = &'a FolderPermission>,
    now: DateTime<Utc>,
) -> Option<PermissionLevel> {
    grants
        .into_iter()
        .filter(|g| g.is_active_at(now))
        .map(|g| g.level)
        .max()
}
