mod common;

use arbor_core::NodeEventKind;
use arbor_engine::{
    BlockService, BlockSpec, ConflictStrategy, EngineError, RestoreOptions,
};
use arbor_store::BlockStore;

use common::{Harness, OPERATOR, sha};

fn restore_at(deleted_at: chrono::DateTime<chrono::Utc>) -> RestoreOptions {
    RestoreOptions {
        deleted_at,
        strategy: ConflictStrategy::Skip,
    }
}

#[tokio::test]
async fn deleted_subtrees_share_one_instant_and_restore_together() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/a/b/c.txt", 100, 1)).await.unwrap();

    let result = h
        .service
        .delete_by_path(&h.project, &h.repo, "/a/b", OPERATOR)
        .await
        .unwrap();
    assert_eq!(result.deleted_count, 2, "/a/b and /a/b/c.txt");
    assert_eq!(result.freed_size, 100);
    assert!(!h.service.exists(&h.project, &h.repo, "/a/b/c.txt").await.unwrap());
    assert!(h.service.exists(&h.project, &h.repo, "/a").await.unwrap());
    assert_eq!(h.used_bytes().await, 0);

    let folder_points = h
        .service
        .list_deleted_points(&h.project, &h.repo, "/a/b")
        .await
        .unwrap();
    let file_points = h
        .service
        .list_deleted_points(&h.project, &h.repo, "/a/b/c.txt")
        .await
        .unwrap();
    assert_eq!(folder_points, vec![result.deleted_at]);
    assert_eq!(file_points, vec![result.deleted_at], "one shared instant");

    let summary = h
        .service
        .restore_node(&h.project, &h.repo, "/a/b", restore_at(result.deleted_at), OPERATOR)
        .await
        .unwrap();
    assert_eq!(summary.restored, 2);
    assert_eq!(summary.skipped, 0);
    let detail = h.service.node_detail(&h.project, &h.repo, "/a/b/c.txt").await.unwrap();
    assert_eq!(detail.size, 100);
    assert_eq!(h.used_bytes().await, 100, "restored bytes count again");
}

#[tokio::test]
async fn repeated_generations_stack_newest_first() {
    let h = Harness::new();
    let mut instants = Vec::new();
    for seed in 1..=3u8 {
        h.service
            .create_node(h.file_request("/gen.bin", i64::from(seed) * 10, seed))
            .await
            .unwrap();
        let result = h
            .service
            .delete_by_path(&h.project, &h.repo, "/gen.bin", OPERATOR)
            .await
            .unwrap();
        instants.push(result.deleted_at);
    }
    let points = h
        .service
        .list_deleted_points(&h.project, &h.repo, "/gen.bin")
        .await
        .unwrap();
    instants.reverse();
    assert_eq!(points, instants, "every generation keeps its own point");

    // Restore the middle generation specifically.
    let middle = instants[1];
    h.service
        .restore_node(&h.project, &h.repo, "/gen.bin", restore_at(middle), OPERATOR)
        .await
        .unwrap();
    let detail = h.service.node_detail(&h.project, &h.repo, "/gen.bin").await.unwrap();
    assert_eq!(detail.size, 20);
    assert_eq!(detail.sha256.as_deref(), Some(sha(2).as_str()));
}

#[tokio::test]
async fn restoring_a_missing_point_is_not_found() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/x", 1, 1)).await.unwrap();
    let err = h
        .service
        .restore_node(&h.project, &h.repo, "/x", restore_at(chrono::Utc::now()), OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn conflict_strategies_drive_the_outcome() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/x", 10, 1)).await.unwrap();
    let point = h
        .service
        .delete_by_path(&h.project, &h.repo, "/x", OPERATOR)
        .await
        .unwrap()
        .deleted_at;
    h.service.create_node(h.file_request("/x", 20, 2)).await.unwrap();

    // Skip leaves the occupant.
    let summary = h
        .service
        .restore_node(&h.project, &h.repo, "/x", restore_at(point), OPERATOR)
        .await
        .unwrap();
    assert_eq!((summary.restored, summary.skipped), (0, 1));
    assert_eq!(
        h.service.node_detail(&h.project, &h.repo, "/x").await.unwrap().size,
        20
    );

    // Failed aborts.
    let err = h
        .service
        .restore_node(
            &h.project,
            &h.repo,
            "/x",
            RestoreOptions {
                deleted_at: point,
                strategy: ConflictStrategy::Failed,
            },
            OPERATOR,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Overwrite displaces the occupant and brings the old bytes back.
    let summary = h
        .service
        .restore_node(
            &h.project,
            &h.repo,
            "/x",
            RestoreOptions {
                deleted_at: point,
                strategy: ConflictStrategy::Overwrite,
            },
            OPERATOR,
        )
        .await
        .unwrap();
    assert_eq!(summary.restored, 1);
    let detail = h.service.node_detail(&h.project, &h.repo, "/x").await.unwrap();
    assert_eq!(detail.size, 10);
    assert_eq!(h.used_bytes().await, 10);
    // The displaced occupant became a restorable generation itself.
    let points = h
        .service
        .list_deleted_points(&h.project, &h.repo, "/x")
        .await
        .unwrap();
    assert_eq!(points.len(), 1);
    let displaced = h
        .service
        .deleted_detail(&h.project, &h.repo, "/x", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(displaced.size, 20);
}

#[tokio::test]
async fn folder_restore_merges_into_live_folders() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/dir/old.bin", 10, 1)).await.unwrap();
    let point = h
        .service
        .delete_by_path(&h.project, &h.repo, "/dir", OPERATOR)
        .await
        .unwrap()
        .deleted_at;
    // A new generation of the folder with different content.
    h.service.create_node(h.file_request("/dir/new.bin", 20, 2)).await.unwrap();

    let summary = h
        .service
        .restore_node(&h.project, &h.repo, "/dir", restore_at(point), OPERATOR)
        .await
        .unwrap();
    // The folder record merges, old.bin comes back, new.bin stays.
    assert_eq!(summary.restored, 1);
    assert!(h.service.exists(&h.project, &h.repo, "/dir/old.bin").await.unwrap());
    assert!(h.service.exists(&h.project, &h.repo, "/dir/new.bin").await.unwrap());
    assert_eq!(h.used_bytes().await, 30);
}

#[tokio::test]
async fn delete_before_date_sweeps_only_old_files() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/sweep/old.bin", 10, 1)).await.unwrap();
    let cutoff = chrono::Utc::now();
    h.service.create_node(h.file_request("/sweep/new.bin", 20, 2)).await.unwrap();

    let result = h
        .service
        .delete_before_date(&h.project, &h.repo, "/sweep", cutoff, None, OPERATOR)
        .await
        .unwrap();
    assert_eq!(result.deleted_count, 1);
    assert_eq!(result.freed_size, 10);
    assert!(!h.service.exists(&h.project, &h.repo, "/sweep/old.bin").await.unwrap());
    assert!(h.service.exists(&h.project, &h.repo, "/sweep/new.bin").await.unwrap());
    assert!(
        h.service.exists(&h.project, &h.repo, "/sweep").await.unwrap(),
        "folders survive an age sweep"
    );

    let events = h.events.events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e.kind, NodeEventKind::Cleaned { before } if before == cutoff))
    );
}

#[tokio::test]
async fn batch_delete_shares_one_instant_across_paths() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/one.bin", 10, 1)).await.unwrap();
    h.service.create_node(h.file_request("/two.bin", 20, 2)).await.unwrap();

    let result = h
        .service
        .delete_by_paths(
            &h.project,
            &h.repo,
            &["/one.bin".to_owned(), "/missing".to_owned(), "/two.bin".to_owned()],
            OPERATOR,
        )
        .await
        .unwrap();
    assert_eq!(result.deleted_count, 2);
    assert_eq!(result.freed_size, 30);
    let one = h
        .service
        .list_deleted_points(&h.project, &h.repo, "/one.bin")
        .await
        .unwrap();
    let two = h
        .service
        .list_deleted_points(&h.project, &h.repo, "/two.bin")
        .await
        .unwrap();
    assert_eq!(one, two, "both paths share the batch instant");

    let deleted_events: Vec<_> = h
        .events
        .events()
        .into_iter()
        .filter(|e| matches!(e.kind, NodeEventKind::Deleted))
        .collect();
    assert_eq!(deleted_events.len(), 2, "one event per path that deleted");
}

#[tokio::test]
async fn batch_delete_counts_nested_paths_once() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/keep.bin", 50, 1)).await.unwrap();
    h.service.create_node(h.file_request("/a/b/c.txt", 100, 2)).await.unwrap();

    let result = h
        .service
        .delete_by_paths(
            &h.project,
            &h.repo,
            &["/a/b".to_owned(), "/a".to_owned()],
            OPERATOR,
        )
        .await
        .unwrap();
    assert_eq!(result.freed_size, 100, "the nested subtree counts once");
    assert_eq!(result.deleted_count, 3, "/a, /a/b, /a/b/c.txt");
    assert_eq!(h.used_bytes().await, 50);

    let deleted_events: Vec<_> = h
        .events
        .events()
        .into_iter()
        .filter(|e| matches!(e.kind, NodeEventKind::Deleted))
        .collect();
    assert_eq!(deleted_events.len(), 1);
    assert_eq!(deleted_events[0].full_path, "/a");
}

#[tokio::test]
async fn a_batch_naming_the_root_deletes_nothing() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/x/f.bin", 40, 1)).await.unwrap();

    let err = h
        .service
        .delete_by_paths(
            &h.project,
            &h.repo,
            &["/x".to_owned(), "/".to_owned()],
            OPERATOR,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(h.service.exists(&h.project, &h.repo, "/x/f.bin").await.unwrap());
    assert_eq!(h.used_bytes().await, 40, "a rejected batch leaves usage alone");
}

#[tokio::test]
async fn the_root_is_never_deletable_but_fully_restorable() {
    let h = Harness::new();
    let err = h
        .service
        .delete_by_path(&h.project, &h.repo, "/", OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    h.service.create_node(h.file_request("/a/x.bin", 10, 1)).await.unwrap();
    h.service.create_node(h.file_request("/b/y.bin", 20, 2)).await.unwrap();
    let a = h
        .service
        .delete_by_path(&h.project, &h.repo, "/a", OPERATOR)
        .await
        .unwrap();
    // A root restore replays one deletion point across the tree.
    let summary = h
        .service
        .restore_node(&h.project, &h.repo, "/", restore_at(a.deleted_at), OPERATOR)
        .await
        .unwrap();
    assert_eq!(summary.restored, 2);
    assert!(h.service.exists(&h.project, &h.repo, "/a/x.bin").await.unwrap());
}

#[tokio::test]
async fn reference_counts_survive_the_delete_restore_cycle() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/ref.bin", 10, 7)).await.unwrap();
    assert_eq!(h.service.references().count(&sha(7), None).await.unwrap(), 1);

    let point = h
        .service
        .delete_by_path(&h.project, &h.repo, "/ref.bin", OPERATOR)
        .await
        .unwrap()
        .deleted_at;
    assert_eq!(
        h.service.references().count(&sha(7), None).await.unwrap(),
        1,
        "a tombstoned generation still holds its content"
    );

    h.service
        .restore_node(&h.project, &h.repo, "/ref.bin", restore_at(point), OPERATOR)
        .await
        .unwrap();
    assert_eq!(h.service.references().count(&sha(7), None).await.unwrap(), 1);
}

#[tokio::test]
async fn block_records_follow_their_node_through_delete_and_restore() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/blocky.bin", 200, 1)).await.unwrap();
    let block_service = BlockService::for_service(&h.service);
    for (seed, range) in [(2u8, (0, 100)), (3u8, (100, 200))] {
        block_service
            .add_block(
                &h.project,
                &h.repo,
                "/blocky.bin",
                BlockSpec {
                    sha256: sha(seed),
                    start_pos: range.0,
                    end_pos: range.1,
                    upload_id: None,
                    session_expires: None,
                },
                OPERATOR,
            )
            .await
            .unwrap();
    }
    assert_eq!(
        h.blocks.list_live(&h.project, &h.repo, "/blocky.bin").await.unwrap().len(),
        2
    );

    let point = h
        .service
        .delete_by_path(&h.project, &h.repo, "/blocky.bin", OPERATOR)
        .await
        .unwrap()
        .deleted_at;
    assert!(
        h.blocks.list_live(&h.project, &h.repo, "/blocky.bin").await.unwrap().is_empty(),
        "blocks tombstone with their node"
    );

    h.service
        .restore_node(&h.project, &h.repo, "/blocky.bin", restore_at(point), OPERATOR)
        .await
        .unwrap();
    assert_eq!(
        h.blocks.list_live(&h.project, &h.repo, "/blocky.bin").await.unwrap().len(),
        2,
        "blocks restore with their node"
    );
}
