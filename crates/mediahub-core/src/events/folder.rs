//! Folder-related domain events.

use serde::{Deserialize, Serialize};

use crate::types::FolderId;

/// Events related to folder operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FolderEvent {
    /// A folder was created.
    Created {
        /// The folder ID.
        folder_id: FolderId,
        /// The parent folder (None for a root).
        parent_id: Option<FolderId>,
        /// The folder name.
        name: String,
    },
    /// A folder was renamed.
    Renamed {
        /// The folder ID.
        folder_id: FolderId,
        /// Previous name.
        old_name: String,
        /// New name.
        new_name: String,
    },
    /// Display metadata or visibility changed.
    Updated {
        /// The folder ID.
        folder_id: FolderId,
    },
    /// A folder was reparented.
    Moved {
        /// The folder ID.
        folder_id: FolderId,
        /// Previous parent.
        from_parent_id: Option<FolderId>,
        /// New parent.
        to_parent_id: Option<FolderId>,
        /// Number of descendants whose path/depth were rewritten.
        descendants_rewritten: usize,
    },
    /// A folder and its subtree were deleted.
    Deleted {
        /// The folder ID.
        folder_id: FolderId,
        /// Number of folders removed, including the folder itself.
        removed_folders: usize,
    },
    /// Direct file statistics of a folder changed.
    StatsChanged {
        /// The folder ID.
        folder_id: FolderId,
        /// Change in file count.
        file_delta: i64,
        /// Change in total bytes.
        size_delta: i64,
    },
    /// Drifted records were rewritten by an integrity repair.
    Repaired {
        /// Number of folder records rewritten.
        records: usize,
    },
}

impl FolderEvent {
    /// Short machine-readable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "folder.created",
            Self::Renamed { .. } => "folder.renamed",
            Self::Updated { .. } => "folder.updated",
            Self::Moved { .. } => "folder.moved",
            Self::Deleted { .. } => "folder.deleted",
            Self::StatsChanged { .. } => "folder.stats_changed",
            Self::Repaired { .. } => "folder.repaired",
        }
    }
}
