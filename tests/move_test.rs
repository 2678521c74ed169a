//! Integration tests for folder moves.

mod helpers;

use helpers::{ALICE, BOB, TestHub, ctx};
use mediahub_core::ErrorKind;
use mediahub_core::config::AppConfig;
use mediahub_core::types::FolderId;
use mediahub_entity::folder::FileStats;
use mediahub_entity::permission::PermissionLevel;
use mediahub_service::GrantRequest;

#[tokio::test]
async fn test_move_under_own_descendant_is_cyclic() {
    let hub = TestHub::new().await;
    let root = hub.seed(1, ALICE, None, "root").await;
    let a = hub.seed(2, ALICE, Some(&root), "A").await;
    let b = hub.seed(3, ALICE, Some(&a), "B").await;
    let before = hub.store.snapshot().await;

    let err = hub
        .facade
        .move_folder(&ctx(ALICE), a.id, Some(b.id))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::CyclicMove);
    assert_eq!(hub.store.snapshot().await, before);
    assert!(!hub.sink.names().await.contains(&"folder.moved"));
}

#[tokio::test]
async fn test_move_into_itself_is_cyclic() {
    let hub = TestHub::new().await;
    let root = hub.seed(1, ALICE, None, "root").await;

    let err = hub
        .facade
        .move_folder(&ctx(ALICE), root.id, Some(root.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CyclicMove);
}

#[tokio::test]
async fn test_root_moved_under_root() {
    let hub = TestHub::new().await;
    let root = hub.seed(1, ALICE, None, "root").await;
    let c = hub.seed(2, ALICE, None, "C").await;

    let moved = hub
        .facade
        .move_folder(&ctx(ALICE), c.id, Some(root.id))
        .await
        .unwrap();

    assert_eq!(moved.path, format!("/{}/{}", root.id, c.id));
    assert_eq!(moved.depth, 1);
    assert_eq!(hub.get(c.id).await, moved);
    assert_eq!(hub.sink.names().await, vec!["folder.moved"]);
    hub.assert_consistent().await;
}

#[tokio::test]
async fn test_move_keeps_subtree_shape_and_rewrites_prefixes() {
    let hub = TestHub::new().await;
    let photos = hub.create(ALICE, None, "Photos").await;
    let archive = hub.create(ALICE, None, "Archive").await;
    let trip = hub.create(ALICE, Some(&photos), "Trip").await;
    let day1 = hub.create(ALICE, Some(&trip), "Day 1").await;
    let raw = hub.create(ALICE, Some(&day1), "Raw").await;
    hub.add_files(ALICE, raw.id, 4, 4_000).await;
    hub.add_files(ALICE, trip.id, 1, 500).await;

    hub.facade
        .move_folder(&ctx(ALICE), trip.id, Some(archive.id))
        .await
        .unwrap();

    let trip = hub.get(trip.id).await;
    let day1 = hub.get(day1.id).await;
    let raw = hub.get(raw.id).await;
    assert_eq!(trip.parent_id, Some(archive.id));
    assert_eq!(day1.parent_id, Some(trip.id));
    assert_eq!(raw.parent_id, Some(day1.id));
    assert!(raw.path.starts_with(&archive.path));
    assert_eq!(raw.depth, 3);

    assert_eq!(trip.stats(), FileStats::new(5, 4_500));
    assert_eq!(hub.get(photos.id).await.stats(), FileStats::ZERO);
    assert_eq!(hub.get(archive.id).await.stats(), FileStats::new(5, 4_500));
    hub.assert_consistent().await;
}

#[tokio::test]
async fn test_move_within_tree_leaves_common_ancestor_alone() {
    let hub = TestHub::new().await;
    let root = hub.create(ALICE, None, "Root").await;
    let left = hub.create(ALICE, Some(&root), "Left").await;
    let right = hub.create(ALICE, Some(&root), "Right").await;
    let leaf = hub.create(ALICE, Some(&left), "Leaf").await;
    hub.add_files(ALICE, leaf.id, 2, 20).await;
    let root_before = hub.get(root.id).await;

    hub.facade
        .move_folder(&ctx(ALICE), leaf.id, Some(right.id))
        .await
        .unwrap();

    assert_eq!(hub.get(root.id).await, root_before);
    assert_eq!(hub.get(left.id).await.stats(), FileStats::ZERO);
    assert_eq!(hub.get(right.id).await.stats(), FileStats::new(2, 20));
    hub.assert_consistent().await;
}

#[tokio::test]
async fn test_move_to_current_parent_is_noop() {
    let hub = TestHub::new().await;
    let root = hub.create(ALICE, None, "Root").await;
    let child = hub.create(ALICE, Some(&root), "Child").await;
    hub.sink.clear().await;

    let same = hub
        .facade
        .move_folder(&ctx(ALICE), child.id, Some(root.id))
        .await
        .unwrap();

    assert_eq!(same, child);
    assert!(hub.sink.names().await.is_empty());
}

#[tokio::test]
async fn test_move_rejects_duplicate_sibling_name() {
    let hub = TestHub::new().await;
    let a = hub.create(ALICE, None, "A").await;
    let b = hub.create(ALICE, None, "B").await;
    hub.create(ALICE, Some(&a), "Summer").await;
    let other = hub.create(ALICE, Some(&b), "summer").await;

    let err = hub
        .facade
        .move_folder(&ctx(ALICE), other.id, Some(a.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateName);
    assert_eq!(hub.get(other.id).await.parent_id, Some(b.id));
}

#[tokio::test]
async fn test_move_to_missing_target_is_not_found() {
    let hub = TestHub::new().await;
    let a = hub.create(ALICE, None, "A").await;

    let err = hub
        .facade
        .move_folder(&ctx(ALICE), a.id, Some(FolderId::new()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_move_to_root_level() {
    let hub = TestHub::new().await;
    let root = hub.create(ALICE, None, "Root").await;
    let child = hub.create(ALICE, Some(&root), "Child").await;
    hub.add_files(ALICE, child.id, 1, 10).await;

    let moved = hub.facade.move_folder(&ctx(ALICE), child.id, None).await.unwrap();

    assert!(moved.is_root());
    assert_eq!(moved.depth, 0);
    assert_eq!(hub.get(root.id).await.stats(), FileStats::ZERO);
    hub.assert_consistent().await;
}

#[tokio::test]
async fn test_move_needs_edit_on_both_ends() {
    let hub = TestHub::new().await;
    let mine = hub.create(ALICE, None, "Mine").await;
    let theirs = hub.create(BOB, None, "Theirs").await;

    let err = hub
        .facade
        .move_folder(&ctx(ALICE), mine.id, Some(theirs.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);

    hub.facade
        .grant(
            &ctx(BOB),
            GrantRequest {
                folder_id: theirs.id,
                user_id: ALICE,
                level: PermissionLevel::Edit,
                expires_at: None,
            },
        )
        .await
        .unwrap();

    let moved = hub
        .facade
        .move_folder(&ctx(ALICE), mine.id, Some(theirs.id))
        .await
        .unwrap();
    assert_eq!(moved.parent_id, Some(theirs.id));
    hub.assert_consistent().await;
}

#[tokio::test]
async fn test_move_to_root_requires_admin() {
    let hub = TestHub::new().await;
    let root = hub.create(ALICE, None, "Root").await;
    let child = hub.create(ALICE, Some(&root), "Child").await;
    hub.facade
        .grant(
            &ctx(ALICE),
            GrantRequest {
                folder_id: child.id,
                user_id: BOB,
                level: PermissionLevel::Edit,
                expires_at: None,
            },
        )
        .await
        .unwrap();

    let err = hub
        .facade
        .move_folder(&ctx(BOB), child.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_move_beyond_depth_limit_is_rejected() {
    let mut config = AppConfig::default();
    config.hierarchy.max_depth = 2;
    let hub = TestHub::with_config(config).await;
    let deep_root = hub.create(ALICE, None, "Deep").await;
    let level1 = hub.create(ALICE, Some(&deep_root), "L1").await;
    let level2 = hub.create(ALICE, Some(&level1), "L2").await;
    let other = hub.create(ALICE, None, "Other").await;
    hub.create(ALICE, Some(&other), "Sub").await;

    let err = hub
        .facade
        .move_folder(&ctx(ALICE), other.id, Some(level2.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
