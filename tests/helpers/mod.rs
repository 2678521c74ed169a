//! Shared helpers for the façade integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use mediahub_core::config::AppConfig;
use mediahub_core::types::{FolderId, UserId};
use mediahub_database::{FolderFilter, FolderStore, MemoryFolderStore, UserDirectory};
use mediahub_entity::folder::{FileStats, Folder, path};
use mediahub_entity::permission::{FolderPermission, PermissionLevel};
use mediahub_service::{
    AccessFacade, CreateFolderRequest, MemoryEventSink, RequestContext, TreeBuilder,
};

/// Owner used by most tests.
pub const ALICE: UserId = UserId::from_u128(0xA);
/// Second principal.
pub const BOB: UserId = UserId::from_u128(0xB);
/// Third principal.
pub const CAROL: UserId = UserId::from_u128(0xC);

/// Façade over an in-memory store with a recording event sink.
pub struct TestHub {
    /// Backing store, for seeding and direct inspection
    pub store: MemoryFolderStore,
    /// Every event the façade published
    pub sink: MemoryEventSink,
    /// The system under test
    pub facade: AccessFacade,
}

impl TestHub {
    /// Hub with default configuration and the three test users registered.
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    /// Hub with the given configuration.
    pub async fn with_config(config: AppConfig) -> Self {
        let store = MemoryFolderStore::new();
        for user in [ALICE, BOB, CAROL] {
            store.add_user(user).await;
        }
        Self::over(store, config)
    }

    /// Hub over an existing store.
    pub fn over(store: MemoryFolderStore, config: AppConfig) -> Self {
        let sink = MemoryEventSink::new();
        let shared = Arc::new(store.clone());
        let folders: Arc<dyn FolderStore> = shared.clone();
        let users: Arc<dyn UserDirectory> = shared;
        let facade = AccessFacade::new(folders, users, Arc::new(sink.clone()), &config);
        Self {
            store,
            sink,
            facade,
        }
    }

    /// Create a folder through the façade as `user`.
    pub async fn create(&self, user: UserId, parent: Option<&Folder>, name: &str) -> Folder {
        self.facade
            .create_folder(
                &RequestContext::new(user),
                CreateFolderRequest {
                    parent_id: parent.map(|p| p.id),
                    name: name.to_string(),
                    ..CreateFolderRequest::default()
                },
            )
            .await
            .expect("create folder")
    }

    /// Insert a record with a fixed id straight into the store, with an
    /// `Admin` grant for its owner.
    pub async fn seed(&self, id: u128, owner: UserId, parent: Option<&Folder>, name: &str) -> Folder {
        let folder = Folder::new(FolderId::from_u128(id), owner, parent, name, id as i32);
        self.store.put_raw(folder.clone()).await;
        self.store
            .save_permission(&FolderPermission::new(
                folder.id,
                owner,
                PermissionLevel::Admin,
                owner,
                None,
            ))
            .await
            .expect("seed grant");
        folder
    }

    /// Current stored record.
    pub async fn get(&self, id: FolderId) -> Folder {
        self.store
            .get_folder(id)
            .await
            .expect("store read")
            .expect("folder exists")
    }

    /// Report a change in a folder's direct files through the façade.
    pub async fn add_files(&self, user: UserId, folder: FolderId, count: i64, bytes: i64) -> Folder {
        self.facade
            .record_file_change(&RequestContext::new(user), folder, FileStats::new(count, bytes))
            .await
            .expect("record file change")
    }

    /// Assert every stored record agrees with its parent chain and that every
    /// aggregate equals a rebuild from direct statistics.
    pub async fn assert_consistent(&self) {
        let records = self
            .store
            .list_folders(FolderFilter::All)
            .await
            .expect("list folders");
        let by_id: HashMap<FolderId, &Folder> = records.iter().map(|f| (f.id, f)).collect();

        for folder in &records {
            match folder.parent_id {
                None => {
                    assert_eq!(folder.path, path::root_path(folder.id), "root path of {}", folder.name);
                    assert_eq!(folder.depth, 0, "root depth of {}", folder.name);
                }
                Some(parent_id) => {
                    let parent = by_id.get(&parent_id).expect("parent exists");
                    assert_eq!(
                        folder.path,
                        path::child_path(&parent.path, folder.id),
                        "path of {}",
                        folder.name
                    );
                    assert_eq!(folder.depth, parent.depth + 1, "depth of {}", folder.name);
                }
            }
        }

        let ids: Vec<FolderId> = records.iter().map(|f| f.id).collect();
        let direct = self.store.direct_file_stats(&ids).await.expect("direct stats");
        let forest = TreeBuilder::build(&records, &direct, &Default::default()).expect("tree builds");
        for node in forest.iter() {
            let stored = by_id[&node.id];
            assert_eq!(stored.stats(), node.stats(), "aggregates of {}", stored.name);
        }
    }
}

/// Request context for a user.
pub fn ctx(user: UserId) -> RequestContext {
    RequestContext::new(user)
}
