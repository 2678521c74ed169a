//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use mediahub_core::AppError;
use mediahub_core::types::{FolderId, UserId};

use super::path;
use super::stats::FileStats;

/// Default access policy applied when a principal has no explicit grant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "folder_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only explicit grants give access.
    #[default]
    Private,
    /// Shared with specific users through explicit grants.
    Shared,
    /// Anyone may view.
    Public,
}

impl Visibility {
    /// Return the visibility as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            "public" => Ok(Self::Public),
            _ => Err(AppError::validation(format!("Invalid visibility: '{s}'"))),
        }
    }
}

/// A folder in the media library hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// The user who created the folder.
    pub owner_id: UserId,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<FolderId>,
    /// Display name, unique among siblings.
    pub name: String,
    /// Materialized id chain, e.g. `/<root>/<child>/<self>`.
    pub path: String,
    /// Depth in the folder tree (0 for root).
    pub depth: i32,
    /// Display order among siblings.
    pub sort_order: i32,
    /// Display color.
    pub color: Option<String>,
    /// Display icon.
    pub icon: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Default access policy.
    pub visibility: Visibility,
    /// Files in this folder and all descendants.
    pub file_count: i64,
    /// Bytes in this folder and all descendants.
    pub total_size: i64,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Build a new folder record under `parent` (or as a root).
    ///
    /// Path and depth are derived from the parent; aggregates start at zero.
    pub fn new(
        id: FolderId,
        owner_id: UserId,
        parent: Option<&Folder>,
        name: impl Into<String>,
        sort_order: i32,
    ) -> Self {
        let now = Utc::now();
        let (parent_id, path, depth) = match parent {
            Some(p) => (Some(p.id), path::child_path(&p.path, id), p.depth + 1),
            None => (None, path::root_path(id), 0),
        };
        Self {
            id,
            owner_id,
            parent_id,
            name: name.into(),
            path,
            depth,
            sort_order,
            color: None,
            icon: None,
            description: None,
            visibility: Visibility::default(),
            file_count: 0,
            total_size: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Aggregate statistics stored on the record.
    pub fn stats(&self) -> FileStats {
        FileStats::new(self.file_count, self.total_size)
    }

    /// Overwrite the stored aggregate statistics.
    pub fn set_stats(&mut self, stats: FileStats) {
        self.file_count = stats.file_count;
        self.total_size = stats.total_size;
    }

    /// Id of the top-level folder this folder belongs to, read from the path.
    pub fn tree_root_id(&self) -> Option<FolderId> {
        path::parse_path(&self.path)
            .ok()
            .and_then(|ids| ids.first().copied())
    }

    /// Whether `self` lies inside the subtree rooted at `ancestor` (or is it).
    pub fn is_within(&self, ancestor: &Folder) -> bool {
        path::is_within(&self.path, &ancestor.path)
    }

    /// Whether `path`/`depth` agree with the given parent record.
    pub fn placement_matches(&self, parent: Option<&Folder>) -> bool {
        match parent {
            Some(p) => self.path == path::child_path(&p.path, self.id) && self.depth == p.depth + 1,
            None => self.path == path::root_path(self.id) && self.depth == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_root_and_child_paths() {
        let owner = UserId::from_u128(9);
        let root = Folder::new(FolderId::from_u128(1), owner, None, "Library", 0);
        let child = Folder::new(FolderId::from_u128(2), owner, Some(&root), "Photos", 0);

        assert!(root.is_root());
        assert_eq!(root.depth, 0);
        assert_eq!(root.path, format!("/{}", root.id));
        assert_eq!(child.depth, 1);
        assert_eq!(child.path, format!("/{}/{}", root.id, child.id));
        assert_eq!(child.tree_root_id(), Some(root.id));
        assert!(child.is_within(&root));
        assert!(!root.is_within(&child));
        assert!(child.placement_matches(Some(&root)));
        assert!(!child.placement_matches(None));
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!("PUBLIC".parse::<Visibility>().unwrap(), Visibility::Public);
        assert!("everyone".parse::<Visibility>().is_err());
    }
}
