//! # mediahub-database
//!
//! The folder store collaborator: the [`FolderStore`] and
//! [`UserDirectory`] traits, a PostgreSQL implementation built from
//! per-table repositories, and an in-memory implementation used by tests
//! and by the CLI's `memory` backend.

pub mod memory;
pub mod migration;
pub mod postgres;
pub mod repositories;
pub mod store;

pub use memory::{DirectFileStats, MemoryFolderStore, StoreSnapshot};
pub use postgres::PgFolderStore;
pub use store::{FolderChanges, FolderFilter, FolderStore, UserDirectory};
