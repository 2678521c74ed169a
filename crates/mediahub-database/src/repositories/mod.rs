//! PostgreSQL repository implementations, one per table.

pub mod file;
pub mod folder;
pub mod permission;
pub mod user;

pub use file::FileStatsRepository;
pub use folder::FolderRepository;
pub use permission::PermissionRepository;
pub use user::UserRepository;
