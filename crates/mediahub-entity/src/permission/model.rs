//! Folder permission grant entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use mediahub_core::types::{FolderId, PermissionId, UserId};

use super::level::PermissionLevel;

/// An explicit grant of a permission level to a user on one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FolderPermission {
    /// Unique grant identifier.
    pub id: PermissionId,
    /// The folder this grant applies to.
    pub folder_id: FolderId,
    /// The grantee.
    pub user_id: UserId,
    /// Granted level.
    pub level: PermissionLevel,
    /// Who issued the grant.
    pub granted_by: UserId,
    /// When the grant was issued.
    pub granted_at: DateTime<Utc>,
    /// When this grant expires (None = never).
    pub expires_at: Option<DateTime<Utc>>,
}

impl FolderPermission {
    /// Create a new grant issued now.
    pub fn new(
        folder_id: FolderId,
        user_id: UserId,
        level: PermissionLevel,
        granted_by: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: PermissionId::new(),
            folder_id,
            user_id,
            level,
            granted_by,
            granted_at: Utc::now(),
            expires_at,
        }
    }

    /// Whether the grant is in force at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }

    /// Check if this grant has expired.
    pub fn is_expired(&self) -> bool {
        !self.is_active_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_is_exclusive() {
        let now = Utc::now();
        let mut grant = FolderPermission::new(
            FolderId::from_u128(5),
            UserId::from_u128(7),
            PermissionLevel::View,
            UserId::from_u128(1),
            Some(now),
        );
        assert!(!grant.is_active_at(now));
        assert!(grant.is_active_at(now - Duration::seconds(1)));

        grant.expires_at = None;
        assert!(grant.is_active_at(now + Duration::days(3650)));
        assert!(!grant.is_expired());
    }
}
