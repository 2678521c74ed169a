//! Integration tests for tree reads and breadcrumbs.

mod helpers;

use helpers::{ALICE, BOB, TestHub, ctx};
use mediahub_core::ErrorKind;
use mediahub_core::events::{EventPayload, SystemEvent};
use mediahub_core::types::FolderId;
use mediahub_entity::folder::{FileStats, Folder};
use mediahub_entity::permission::PermissionLevel;
use mediahub_service::{GrantRequest, TreeScope};

#[tokio::test]
async fn test_library_tree_orders_and_aggregates() {
    let hub = TestHub::new().await;
    let photos = hub.create(ALICE, None, "Photos").await;
    let videos = hub.create(ALICE, None, "Videos").await;
    let b = hub.create(ALICE, Some(&photos), "beach").await;
    let a = hub.create(ALICE, Some(&photos), "Alps").await;
    hub.add_files(ALICE, a.id, 2, 200).await;
    hub.add_files(ALICE, b.id, 1, 50).await;
    hub.add_files(ALICE, photos.id, 1, 1).await;

    let forest = hub
        .facade
        .get_tree(&ctx(ALICE), TreeScope::Library(ALICE))
        .await
        .unwrap();

    let roots: Vec<FolderId> = forest.roots.iter().map(|n| n.id).collect();
    assert_eq!(roots, vec![photos.id, videos.id]);
    let photos_node = &forest.roots[0];
    let children: Vec<FolderId> = photos_node.children.iter().map(|n| n.id).collect();
    assert_eq!(children, vec![b.id, a.id]);
    assert_eq!(photos_node.stats(), FileStats::new(4, 251));
    assert_eq!(photos_node.direct, FileStats::new(1, 1));
    assert_eq!(forest.total_folders, 4);
    assert_eq!(forest.orphans().count(), 0);
}

#[tokio::test]
async fn test_library_is_private_to_its_owner() {
    let hub = TestHub::new().await;
    hub.create(ALICE, None, "Photos").await;

    let err = hub
        .facade
        .get_tree(&ctx(BOB), TreeScope::Library(ALICE))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_subtree_requires_view() {
    let hub = TestHub::new().await;
    let photos = hub.create(ALICE, None, "Photos").await;
    let trip = hub.create(ALICE, Some(&photos), "Trip").await;
    hub.create(ALICE, Some(&trip), "Day 1").await;

    let err = hub
        .facade
        .get_tree(&ctx(BOB), TreeScope::Subtree(trip.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);

    hub.facade
        .grant(
            &ctx(ALICE),
            GrantRequest {
                folder_id: trip.id,
                user_id: BOB,
                level: PermissionLevel::View,
                expires_at: None,
            },
        )
        .await
        .unwrap();

    let forest = hub
        .facade
        .get_tree(&ctx(BOB), TreeScope::Subtree(trip.id))
        .await
        .unwrap();
    assert_eq!(forest.roots.len(), 1);
    assert_eq!(forest.roots[0].id, trip.id);
    assert!(!forest.roots[0].dangling_parent);
    assert_eq!(forest.total_folders, 2);
}

#[tokio::test]
async fn test_tree_reflects_mutations() {
    let hub = TestHub::new().await;
    let photos = hub.create(ALICE, None, "Photos").await;
    let scope = TreeScope::Library(ALICE);

    let before = hub.facade.get_tree(&ctx(ALICE), scope).await.unwrap();
    assert_eq!(before.total_folders, 1);

    hub.create(ALICE, Some(&photos), "New").await;
    let after = hub.facade.get_tree(&ctx(ALICE), scope).await.unwrap();
    assert_eq!(after.total_folders, 2);
}

#[tokio::test]
async fn test_orphan_is_flagged() {
    let hub = TestHub::new().await;
    let root = hub.seed(1, ALICE, None, "Root").await;
    let ghost = Folder::new(FolderId::from_u128(99), ALICE, Some(&root), "Ghost", 0);
    let orphan = hub.seed(2, ALICE, Some(&ghost), "Orphan").await;

    let forest = hub
        .facade
        .get_tree(&ctx(ALICE), TreeScope::Library(ALICE))
        .await
        .unwrap();

    let flagged: Vec<FolderId> = forest.orphans().map(|n| n.id).collect();
    assert_eq!(flagged, vec![orphan.id]);
    assert_eq!(forest.total_folders, 2);
}

#[tokio::test]
async fn test_cycle_fails_with_structural_integrity() {
    let hub = TestHub::new().await;
    let root = hub.seed(1, ALICE, None, "Root").await;
    let a = hub.seed(2, ALICE, Some(&root), "A").await;
    let b = hub.seed(3, ALICE, Some(&a), "B").await;
    let mut looped = a.clone();
    looped.parent_id = Some(b.id);
    hub.store.put_raw(looped).await;

    let err = hub
        .facade
        .get_tree(&ctx(ALICE), TreeScope::Library(ALICE))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StructuralIntegrity);

    let alerts: Vec<Vec<FolderId>> = hub
        .sink
        .events()
        .await
        .into_iter()
        .filter_map(|e| match e.payload {
            EventPayload::System(SystemEvent::IntegrityViolation { folder_ids, .. }) => {
                Some(folder_ids)
            }
            _ => None,
        })
        .collect();
    assert_eq!(alerts, vec![vec![a.id, b.id]]);
}

#[tokio::test]
async fn test_breadcrumbs_run_root_to_folder() {
    let hub = TestHub::new().await;
    let photos = hub.create(ALICE, None, "Photos").await;
    let trip = hub.create(ALICE, Some(&photos), "Trip").await;
    let day = hub.create(ALICE, Some(&trip), "Day").await;

    let crumbs = hub.facade.breadcrumbs(&ctx(ALICE), day.id).await.unwrap();
    let names: Vec<&str> = crumbs.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Photos", "Trip", "Day"]);
}

#[tokio::test]
async fn test_breadcrumbs_report_broken_chain() {
    let hub = TestHub::new().await;
    let root = hub.seed(1, ALICE, None, "Root").await;
    let ghost = Folder::new(FolderId::from_u128(99), ALICE, Some(&root), "Ghost", 0);
    let orphan = hub.seed(2, ALICE, Some(&ghost), "Orphan").await;

    let err = hub.facade.breadcrumbs(&ctx(ALICE), orphan.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StructuralIntegrity);
    assert!(hub.sink.names().await.contains(&"system.integrity_violation"));
}
