//! Folder ACL inheritance resolution.
//!
//! Grants are flat by default. When a caller asks for inherited
//! resolution, the folder and every ancestor named in its materialized
//! path are considered, and the highest live grant among them wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use mediahub_core::result::AppResult;
use mediahub_core::types::UserId;
use mediahub_database::FolderStore;
use mediahub_entity::folder::{Folder, path};
use mediahub_entity::permission::PermissionLevel;

use super::checker::highest_live;

/// Resolves permissions across a folder's ancestry chain.
#[derive(Debug, Clone)]
pub struct AclInheritanceResolver {
    /// Folder store for grant lookups.
    store: Arc<dyn FolderStore>,
}

impl AclInheritanceResolver {
    /// Creates a new inheritance resolver.
    pub fn new(store: Arc<dyn FolderStore>) -> Self {
        Self { store }
    }

    /// Highest live level the user holds on the folder or any ancestor.
    ///
    /// The ancestry is read from the folder's path in one query. A path
    /// that cannot be parsed is a `StructuralIntegrity` error.
    pub async fn resolve_folder_permission_at(
        &self,
        folder: &Folder,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PermissionLevel>> {
        let chain = path::parse_path(&folder.path)?;
        let grants = self.store.list_user_permissions(user_id, &chain).await?;
        let level = highest_live(&grants, now);

        debug!(
            folder_id = %folder.id,
            user_id = %user_id,
            ancestors = chain.len(),
            level = ?level,
            "Resolved inherited folder permission"
        );
        Ok(level)
    }
}
