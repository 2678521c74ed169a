//! Permission grant domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{FolderId, PermissionId, UserId};

/// Events related to folder permission grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PermissionEvent {
    /// A permission was granted (or an existing grant replaced).
    Granted {
        /// The grant ID.
        permission_id: PermissionId,
        /// The folder.
        folder_id: FolderId,
        /// The grantee.
        user_id: UserId,
        /// Granted level, lowercase.
        level: String,
        /// Optional expiry.
        expires_at: Option<DateTime<Utc>>,
    },
    /// A grant's level or expiry changed.
    Updated {
        /// The grant ID.
        permission_id: PermissionId,
        /// New level, lowercase.
        level: String,
        /// New expiry.
        expires_at: Option<DateTime<Utc>>,
    },
    /// A grant was revoked.
    Revoked {
        /// The grant ID.
        permission_id: PermissionId,
        /// The folder.
        folder_id: FolderId,
        /// The former grantee.
        user_id: UserId,
    },
}

impl PermissionEvent {
    /// Short machine-readable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Granted { .. } => "permission.granted",
            Self::Updated { .. } => "permission.updated",
            Self::Revoked { .. } => "permission.revoked",
        }
    }
}
