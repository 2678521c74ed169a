//! Folder domain entities.

pub mod model;
pub mod path;
pub mod stats;
pub mod tree;

pub use model::{Folder, Visibility};
pub use stats::FileStats;
pub use tree::{FolderForest, FolderNode};
