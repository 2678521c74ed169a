//! Folder hierarchy: tree building, mutations, moves, and integrity checks.

pub mod integrity;
pub mod movement;
pub mod service;
pub mod snapshot;
pub mod tree;

pub use integrity::{IntegrityIssue, IntegrityProblem, IntegrityReport, IntegrityService};
pub use movement::{MoveEngine, MoveInput, MovePlan};
pub use service::{CreateFolderRequest, FolderService, UpdateFolderRequest};
pub use snapshot::FolderSnapshot;
pub use tree::{StructuralFault, TreeBuilder, TreeService};
