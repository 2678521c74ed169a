//! Folder permission (ACL) domain entities.

pub mod level;
pub mod model;

pub use level::PermissionLevel;
pub use model::FolderPermission;
