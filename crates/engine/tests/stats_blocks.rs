mod common;

use chrono::{Duration, Utc};

use arbor_engine::{BlockService, BlockSpec, EngineError};

use common::{Harness, OPERATOR, sha};

fn spec(seed: u8, start: u64, end: u64, upload_id: Option<&str>) -> BlockSpec {
    BlockSpec {
        sha256: sha(seed),
        start_pos: start,
        end_pos: end,
        upload_id: upload_id.map(str::to_owned),
        session_expires: upload_id.map(|_| Utc::now() + Duration::hours(1)),
    }
}

#[tokio::test]
async fn exact_stats_aggregate_the_subtree_and_fill_the_cache() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/docs/a.bin", 10, 1)).await.unwrap();
    h.service.create_node(h.file_request("/docs/sub/b.bin", 20, 2)).await.unwrap();

    let exact = h
        .service
        .compute_size(&h.project, &h.repo, "/docs", false)
        .await
        .unwrap();
    assert_eq!(exact.size, 30);
    assert_eq!(exact.file_count, 2);
    assert_eq!(exact.node_count, 3, "a.bin, sub, sub/b.bin");

    let file = h
        .service
        .compute_size(&h.project, &h.repo, "/docs/a.bin", false)
        .await
        .unwrap();
    assert_eq!((file.size, file.file_count, file.node_count), (10, 1, 1));
}

#[tokio::test]
async fn estimates_answer_from_cached_child_folders() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/docs/a.bin", 10, 1)).await.unwrap();
    h.service.create_node(h.file_request("/docs/sub/b.bin", 20, 2)).await.unwrap();

    // No exact pass yet: /docs/sub still carries an empty cache.
    let cold = h
        .service
        .compute_size(&h.project, &h.repo, "/docs", true)
        .await
        .unwrap();
    assert_eq!(cold.size, 10);
    assert_eq!(cold.file_count, 1);
    assert_eq!(cold.node_count, 2);

    h.service
        .compute_size(&h.project, &h.repo, "/docs/sub", false)
        .await
        .unwrap();
    let warm = h
        .service
        .compute_size(&h.project, &h.repo, "/docs", true)
        .await
        .unwrap();
    assert_eq!(warm.size, 30);
    assert_eq!(warm.file_count, 2);
    assert_eq!(warm.node_count, 3);
}

#[tokio::test]
async fn size_before_a_cutoff_covers_the_old_files_only() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/data/old.bin", 10, 1)).await.unwrap();
    let cutoff = Utc::now();
    h.service.create_node(h.file_request("/data/new.bin", 20, 2)).await.unwrap();

    let before = h
        .service
        .compute_size_before(&h.project, &h.repo, "/data", cutoff)
        .await
        .unwrap();
    assert_eq!(before, 10);
    assert_eq!(
        h.service.count_file_node(&h.project, &h.repo, "/data").await.unwrap(),
        2
    );
}

#[tokio::test]
async fn sizing_a_missing_node_is_not_found() {
    let h = Harness::new();
    let err = h
        .service
        .compute_size(&h.project, &h.repo, "/ghost", false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn upload_sessions_hide_blocks_until_committed() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/blob.bin", 20, 1)).await.unwrap();
    let service = BlockService::for_service(&h.service);

    service
        .add_block(&h.project, &h.repo, "/blob.bin", spec(2, 0, 10, None), OPERATOR)
        .await
        .unwrap();
    service
        .add_block(&h.project, &h.repo, "/blob.bin", spec(3, 10, 20, Some("u1")), OPERATOR)
        .await
        .unwrap();

    let public = service
        .list_range(&h.project, &h.repo, "/blob.bin", 0, 20, None)
        .await
        .unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].start_pos, 0);

    let session = service
        .list_range(&h.project, &h.repo, "/blob.bin", 0, 20, Some("u1"))
        .await
        .unwrap();
    assert_eq!(session.len(), 2);

    let committed = service
        .commit_upload(&h.project, &h.repo, "/blob.bin", "u1")
        .await
        .unwrap();
    assert_eq!(committed, 1);
    let public = service
        .list_range(&h.project, &h.repo, "/blob.bin", 0, 20, None)
        .await
        .unwrap();
    assert_eq!(public.len(), 2);
}

#[tokio::test]
async fn expired_sessions_are_invisible_even_to_themselves() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/blob.bin", 20, 1)).await.unwrap();
    let service = BlockService::for_service(&h.service);

    let mut stale = spec(2, 0, 10, Some("u1"));
    stale.session_expires = Some(Utc::now() - Duration::hours(1));
    service
        .add_block(&h.project, &h.repo, "/blob.bin", stale, OPERATOR)
        .await
        .unwrap();

    let seen = service
        .list_range(&h.project, &h.repo, "/blob.bin", 0, 20, Some("u1"))
        .await
        .unwrap();
    assert!(seen.is_empty());
}

#[tokio::test]
async fn block_writes_are_validated() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/blob.bin", 20, 1)).await.unwrap();
    h.service
        .create_node(arbor_engine::CreateNodeRequest::folder(
            h.project.clone(),
            h.repo.clone(),
            "/dir",
            OPERATOR,
        ))
        .await
        .unwrap();
    let service = BlockService::for_service(&h.service);

    let empty = service
        .add_block(&h.project, &h.repo, "/blob.bin", spec(2, 10, 10, None), OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(empty, EngineError::Validation(_)));

    let mut bad_hash = spec(2, 0, 10, None);
    bad_hash.sha256 = "zz".repeat(32);
    let err = service
        .add_block(&h.project, &h.repo, "/blob.bin", bad_hash, OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let missing = service
        .add_block(&h.project, &h.repo, "/ghost.bin", spec(2, 0, 10, None), OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(missing, EngineError::NotFound(_)));

    let folder = service
        .add_block(&h.project, &h.repo, "/dir", spec(2, 0, 10, None), OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(folder, EngineError::Validation(_)));
}

#[tokio::test]
async fn range_queries_return_overlaps_in_creation_order() {
    let h = Harness::new();
    h.service.create_node(h.file_request("/blob.bin", 30, 1)).await.unwrap();
    let service = BlockService::for_service(&h.service);
    for (seed, start, end) in [(2, 0, 10), (3, 10, 20), (4, 20, 30)] {
        service
            .add_block(&h.project, &h.repo, "/blob.bin", spec(seed, start, end, None), OPERATOR)
            .await
            .unwrap();
    }

    let middle = service
        .list_range(&h.project, &h.repo, "/blob.bin", 5, 15, None)
        .await
        .unwrap();
    assert_eq!(middle.len(), 2);
    assert_eq!(middle[0].start_pos, 0);
    assert_eq!(middle[1].start_pos, 10);
}
