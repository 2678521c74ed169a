//! Effective permission resolver for folders.
//!
//! Resolution order:
//! 1. Explicit live grants on the folder (or, in inherited mode, on the
//!    folder and its ancestors). The highest level wins.
//! 2. Visibility floor: a `Public` folder gives everyone `View`.
//! 3. Otherwise no access.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mediahub_core::config::{InheritanceMode, PermissionConfig};
use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, UserId};
use mediahub_database::FolderStore;
use mediahub_entity::folder::{Folder, Visibility};
use mediahub_entity::permission::PermissionLevel;

use super::checker::AclChecker;
use super::inheritance::AclInheritanceResolver;

/// Result of resolving a user's access to a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveAccess {
    /// The resolved level, if any.
    pub level: Option<PermissionLevel>,
    /// Where the level came from.
    pub source: AccessSource,
}

impl EffectiveAccess {
    fn denied() -> Self {
        Self {
            level: None,
            source: AccessSource::Denied,
        }
    }

    /// Whether the resolved level is at least `required`.
    pub fn allows(&self, required: PermissionLevel) -> bool {
        self.level.is_some_and(|l| l.has_at_least(required))
    }
}

/// Where an effective permission was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    /// A live grant on the folder itself.
    Grant,
    /// A live grant on an ancestor (inherited mode only).
    Inherited,
    /// Implicit `View` from public visibility.
    PublicVisibility,
    /// No applicable permission.
    Denied,
}

/// Resolves effective folder permissions from grants and visibility.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    /// Folder store for folder lookups.
    store: Arc<dyn FolderStore>,
    /// Direct grant checker.
    acl_checker: AclChecker,
    /// Ancestor grant resolver.
    inheritance: AclInheritanceResolver,
    /// Resolution policy.
    config: PermissionConfig,
}

impl PermissionResolver {
    /// Creates a new resolver over the given store.
    pub fn new(store: Arc<dyn FolderStore>, config: PermissionConfig) -> Self {
        Self {
            acl_checker: AclChecker::new(Arc::clone(&store)),
            inheritance: AclInheritanceResolver::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    /// The configured inheritance mode.
    pub fn inheritance_mode(&self) -> InheritanceMode {
        self.config.inheritance
    }

    /// Resolves access using the configured inheritance mode.
    pub async fn resolve(&self, user_id: UserId, folder: &Folder) -> AppResult<EffectiveAccess> {
        self.resolve_at(user_id, folder, self.config.inheritance, Utc::now())
            .await
    }

    /// Resolves access at an explicit instant with an explicit mode.
    pub async fn resolve_at(
        &self,
        user_id: UserId,
        folder: &Folder,
        mode: InheritanceMode,
        now: DateTime<Utc>,
    ) -> AppResult<EffectiveAccess> {
        let direct = self
            .acl_checker
            .highest_level_at(folder.id, user_id, now)
            .await?;

        let mut access = match direct {
            Some(level) => EffectiveAccess {
                level: Some(level),
                source: AccessSource::Grant,
            },
            None => EffectiveAccess::denied(),
        };

        if mode == InheritanceMode::Ancestors && !folder.is_root() {
            let inherited = self
                .inheritance
                .resolve_folder_permission_at(folder, user_id, now)
                .await?;
            if inherited > access.level {
                access = EffectiveAccess {
                    level: inherited,
                    source: AccessSource::Inherited,
                };
            }
        }

        if access.level.is_none() && folder.visibility == Visibility::Public {
            access = EffectiveAccess {
                level: Some(PermissionLevel::View),
                source: AccessSource::PublicVisibility,
            };
        }

        debug!(
            folder_id = %folder.id,
            user_id = %user_id,
            level = ?access.level,
            source = ?access.source,
            "Resolved effective permission"
        );
        Ok(access)
    }

    /// Effective level under the configured mode.
    pub async fn effective_level(
        &self,
        user_id: UserId,
        folder: &Folder,
    ) -> AppResult<Option<PermissionLevel>> {
        Ok(self.resolve(user_id, folder).await?.level)
    }

    /// Effective level considering grants on every ancestor, regardless of
    /// the configured mode.
    pub async fn effective_level_inherited(
        &self,
        user_id: UserId,
        folder: &Folder,
    ) -> AppResult<Option<PermissionLevel>> {
        let access = self
            .resolve_at(user_id, folder, InheritanceMode::Ancestors, Utc::now())
            .await?;
        Ok(access.level)
    }

    /// Whether the user holds at least `required` on the folder.
    pub async fn has_at_least(
        &self,
        user_id: UserId,
        folder: &Folder,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        Ok(self.resolve(user_id, folder).await?.allows(required))
    }

    /// Fails with `PermissionDenied` unless the user holds at least `required`.
    pub async fn require(
        &self,
        user_id: UserId,
        folder: &Folder,
        required: PermissionLevel,
    ) -> AppResult<()> {
        let access = self.resolve(user_id, folder).await?;
        if access.allows(required) {
            return Ok(());
        }

        warn!(
            folder_id = %folder.id,
            user_id = %user_id,
            required = %required,
            held = ?access.level,
            "Folder access denied"
        );
        Err(AppError::permission_denied(format!(
            "{required} permission required on folder '{}'",
            folder.name
        )))
    }

    /// Boolean access check by id. A missing folder yields `false`.
    pub async fn check_access(
        &self,
        user_id: UserId,
        folder_id: FolderId,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        match self.store.get_folder(folder_id).await? {
            Some(folder) => self.has_at_least(user_id, &folder, required).await,
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mediahub_core::ErrorKind;
    use mediahub_database::MemoryFolderStore;
    use mediahub_entity::permission::FolderPermission;

    const OWNER: UserId = UserId::from_u128(1);
    const GUEST: UserId = UserId::from_u128(2);

    struct Fixture {
        store: Arc<MemoryFolderStore>,
        root: Folder,
        child: Folder,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryFolderStore::new());
        let root = Folder::new(FolderId::from_u128(10), OWNER, None, "Root", 0);
        let child = Folder::new(FolderId::from_u128(11), OWNER, Some(&root), "Child", 0);
        store
            .save_folders(&[root.clone(), child.clone()])
            .await
            .unwrap();
        Fixture { store, root, child }
    }

    fn resolver(store: &Arc<MemoryFolderStore>, mode: InheritanceMode) -> PermissionResolver {
        let store: Arc<dyn FolderStore> = store.clone();
        PermissionResolver::new(store, PermissionConfig { inheritance: mode })
    }

    async fn grant(
        store: &MemoryFolderStore,
        folder: &Folder,
        user: UserId,
        level: PermissionLevel,
        expires_at: Option<DateTime<Utc>>,
    ) {
        let grant = FolderPermission::new(folder.id, user, level, OWNER, expires_at);
        store.save_permission(&grant).await.unwrap();
    }

    #[tokio::test]
    async fn test_admin_implies_every_level() {
        let fx = fixture().await;
        grant(&fx.store, &fx.root, GUEST, PermissionLevel::Admin, None).await;
        let resolver = resolver(&fx.store, InheritanceMode::None);

        for level in PermissionLevel::ALL {
            assert!(resolver.has_at_least(GUEST, &fx.root, level).await.unwrap());
        }
        assert!(
            resolver
                .check_access(GUEST, fx.root.id, PermissionLevel::Delete)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_expired_grant_resolves_to_none() {
        let fx = fixture().await;
        let past = Utc::now() - Duration::minutes(5);
        grant(&fx.store, &fx.root, GUEST, PermissionLevel::Edit, Some(past)).await;
        let resolver = resolver(&fx.store, InheritanceMode::None);

        assert_eq!(resolver.effective_level(GUEST, &fx.root).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_grant_lapses_after_expiry_instant() {
        let fx = fixture().await;
        let expires = Utc::now() + Duration::hours(1);
        grant(&fx.store, &fx.root, GUEST, PermissionLevel::Upload, Some(expires)).await;
        let resolver = resolver(&fx.store, InheritanceMode::None);

        let before = resolver
            .resolve_at(GUEST, &fx.root, InheritanceMode::None, expires - Duration::seconds(1))
            .await
            .unwrap();
        let at = resolver
            .resolve_at(GUEST, &fx.root, InheritanceMode::None, expires)
            .await
            .unwrap();
        assert_eq!(before.level, Some(PermissionLevel::Upload));
        assert_eq!(at.level, None);
    }

    #[tokio::test]
    async fn test_public_floor_applies_only_without_grant() {
        let fx = fixture().await;
        let mut public = fx.root.clone();
        public.visibility = Visibility::Public;
        fx.store.save_folder(&public).await.unwrap();
        let resolver = resolver(&fx.store, InheritanceMode::None);

        let access = resolver.resolve(GUEST, &public).await.unwrap();
        assert_eq!(access.level, Some(PermissionLevel::View));
        assert_eq!(access.source, AccessSource::PublicVisibility);

        grant(&fx.store, &public, GUEST, PermissionLevel::Edit, None).await;
        let access = resolver.resolve(GUEST, &public).await.unwrap();
        assert_eq!(access.level, Some(PermissionLevel::Edit));
        assert_eq!(access.source, AccessSource::Grant);

        let mut shared = fx.child.clone();
        shared.visibility = Visibility::Shared;
        assert_eq!(resolver.effective_level(GUEST, &shared).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flat_mode_ignores_ancestors() {
        let fx = fixture().await;
        grant(&fx.store, &fx.root, GUEST, PermissionLevel::Delete, None).await;

        let flat = resolver(&fx.store, InheritanceMode::None);
        assert_eq!(flat.effective_level(GUEST, &fx.child).await.unwrap(), None);
        assert_eq!(
            flat.effective_level_inherited(GUEST, &fx.child).await.unwrap(),
            Some(PermissionLevel::Delete)
        );

        let inherited = resolver(&fx.store, InheritanceMode::Ancestors);
        let access = inherited.resolve(GUEST, &fx.child).await.unwrap();
        assert_eq!(access.level, Some(PermissionLevel::Delete));
        assert_eq!(access.source, AccessSource::Inherited);
    }

    #[tokio::test]
    async fn test_require_denies_and_missing_folder_is_false() {
        let fx = fixture().await;
        grant(&fx.store, &fx.root, GUEST, PermissionLevel::View, None).await;
        let resolver = resolver(&fx.store, InheritanceMode::None);

        let err = resolver
            .require(GUEST, &fx.root, PermissionLevel::Edit)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
        assert!(
            resolver
                .require(GUEST, &fx.root, PermissionLevel::View)
                .await
                .is_ok()
        );

        let missing = FolderId::from_u128(999);
        assert!(
            !resolver
                .check_access(OWNER, missing, PermissionLevel::View)
                .await
                .unwrap()
        );
    }
}
