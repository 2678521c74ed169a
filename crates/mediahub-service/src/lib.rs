//! # mediahub-service
//!
//! The folder hierarchy engine. Each service orchestrates the folder
//! store, the permission resolver, subtree locks, and the event sink to
//! implement one family of use cases; [`AccessFacade`] wires them together
//! and is the only writer to the store.
//!
//! Services follow constructor injection: every dependency is provided
//! at construction time via `Arc` references.

pub mod cache;
pub mod context;
pub mod events;
pub mod facade;
pub mod folder;
pub mod lock;
pub mod permission;

pub use cache::{TreeCache, TreeScope};
pub use context::RequestContext;
pub use events::{MemoryEventSink, TracingEventSink};
pub use facade::AccessFacade;
pub use folder::{
    CreateFolderRequest, FolderService, IntegrityIssue, IntegrityProblem, IntegrityReport,
    IntegrityService, MoveEngine, MovePlan, TreeBuilder, TreeService, UpdateFolderRequest,
};
pub use lock::TreeLockManager;
pub use permission::{GrantRequest, PermissionService, UpdateGrantRequest};
