//! Conformance suites for store backends.
//!
//! Backends call these from their own test modules to prove they honor
//! the trait contracts, the live-uniqueness invariant in particular.

use chrono::{Duration, Utc};

use arbor_core::{BlockNode, Node, NodePath, ProjectId, RepoName};

use crate::block::BlockStore;
use crate::error::StoreError;
use crate::node::{ListOptions, NodeStore};
use crate::quota::QuotaStore;
use crate::reference::ReferenceStore;

fn scope() -> (ProjectId, RepoName) {
    (ProjectId::new("conf-project"), RepoName::new("conf-repo"))
}

fn folder(project: &ProjectId, repo: &RepoName, path: &str) -> Node {
    Node::new_folder(
        project.clone(),
        repo.clone(),
        &NodePath::parse(path).unwrap(),
        "conformance",
        Utc::now(),
    )
}

fn file(project: &ProjectId, repo: &RepoName, path: &str, size: i64) -> Node {
    Node::new_file(
        project.clone(),
        repo.clone(),
        &NodePath::parse(path).unwrap(),
        size,
        "a".repeat(64),
        "b".repeat(32),
        Vec::new(),
        "conformance",
        Utc::now(),
    )
}

/// Run the full node-store conformance suite against a backend.
///
/// # Panics
/// Panics on any contract violation.
pub async fn run_node_store_conformance_tests(store: &dyn NodeStore) {
    let (project, repo) = scope();

    // Live uniqueness.
    store.insert(folder(&project, &repo, "/a")).await.unwrap();
    let dup = store.insert(folder(&project, &repo, "/a")).await;
    assert!(
        matches!(dup, Err(StoreError::DuplicateKey(_))),
        "second live insert at the same path must be a duplicate key"
    );

    store
        .insert(file(&project, &repo, "/a/one.bin", 10))
        .await
        .unwrap();
    store
        .insert(file(&project, &repo, "/a/two.bin", 20))
        .await
        .unwrap();
    store.insert(folder(&project, &repo, "/ab")).await.unwrap();
    store
        .insert(file(&project, &repo, "/ab/other.bin", 40))
        .await
        .unwrap();

    let found = store.find_live(&project, &repo, "/a/one.bin").await.unwrap();
    assert_eq!(found.as_ref().map(|n| n.size), Some(10));
    assert!(
        store.find_live(&project, &repo, "/missing").await.unwrap().is_none(),
        "absent path must read as None"
    );

    // Subtree queries are boundary-safe: /ab is not inside /a.
    let a = NodePath::parse("/a").unwrap();
    let subtree = store
        .list_subtree_live(&project, &repo, &a, ListOptions::default())
        .await
        .unwrap();
    assert_eq!(subtree.len(), 2, "subtree of /a holds exactly its two files");
    assert_eq!(store.sum_size_live(&project, &repo, &a).await.unwrap(), 30);
    assert_eq!(
        store.count_subtree_live(&project, &repo, &a, true).await.unwrap(),
        2
    );

    let children = store
        .list_children_live(&project, &repo, &NodePath::root(), ListOptions::default())
        .await
        .unwrap();
    assert_eq!(children.len(), 2, "root has children /a and /ab");

    // Tombstone the subtree with one shared instant.
    let t1 = Utc::now();
    let removed = store.tombstone_subtree(&project, &repo, &a, t1).await.unwrap();
    assert_eq!(removed, 3, "folder plus two files tombstoned");
    assert!(store.find_live(&project, &repo, "/a").await.unwrap().is_none());
    assert!(
        store
            .find_live(&project, &repo, "/ab/other.bin")
            .await
            .unwrap()
            .is_some(),
        "sibling under /ab must survive a delete of /a"
    );
    assert_eq!(
        store.sum_size_deleted_at(&project, &repo, &a, t1).await.unwrap(),
        30
    );

    // A second generation at the same path coexists with the tombstones.
    store
        .insert(file(&project, &repo, "/a/one.bin", 11))
        .await
        .unwrap();
    let t2 = Utc::now();
    assert!(store.tombstone_one(&project, &repo, "/a/one.bin", t2).await.unwrap());
    let points = store
        .list_deleted_points(&project, &repo, "/a/one.bin")
        .await
        .unwrap();
    assert_eq!(points, vec![t2, t1], "deletion points newest first");

    // Exact-instant lookup and CAS restore.
    let deleted = store
        .find_deleted_at(&project, &repo, "/a/one.bin", t1)
        .await
        .unwrap();
    assert_eq!(deleted.map(|n| n.size), Some(10));

    let restored = store
        .clear_tombstone(&project, &repo, "/a/one.bin", t2, "conformance", Utc::now())
        .await
        .unwrap();
    assert_eq!(restored.map(|n| n.size), Some(11));
    let blocked = store
        .clear_tombstone(&project, &repo, "/a/one.bin", t1, "conformance", Utc::now())
        .await;
    assert!(
        matches!(blocked, Err(StoreError::DuplicateKey(_))),
        "restore into an occupied path must be a duplicate key"
    );
    assert!(
        store
            .clear_tombstone(&project, &repo, "/a/one.bin", Utc::now(), "conformance", Utc::now())
            .await
            .unwrap()
            .is_none(),
        "restore with a non-matching instant must match nothing"
    );

    // Bulk restore of the t1 generation fails while /a/one.bin is live.
    let bulk = store
        .restore_subtree(&project, &repo, &a, t1, "conformance", Utc::now())
        .await;
    assert!(matches!(bulk, Err(StoreError::DuplicateKey(_))));
    assert!(store.tombstone_one(&project, &repo, "/a/one.bin", Utc::now()).await.unwrap());
    let count = store
        .restore_subtree(&project, &repo, &a, t1, "conformance", Utc::now())
        .await
        .unwrap();
    assert_eq!(count, 3, "the whole t1 generation comes back");
    assert!(store.find_live(&project, &repo, "/a").await.unwrap().is_some());

    // Field mutators.
    assert!(
        store
            .update_folder_stats(&project, &repo, "/a", 30, 2)
            .await
            .unwrap()
    );
    let cached = store.find_live(&project, &repo, "/a").await.unwrap().unwrap();
    assert_eq!((cached.size, cached.node_num), (30, Some(2)));

    let expiry = Utc::now() + Duration::days(7);
    assert!(
        store
            .set_expire_date(&project, &repo, "/a/one.bin", Some(expiry), "conformance", Utc::now())
            .await
            .unwrap()
    );
    assert!(
        store
            .set_archived(&project, &repo, "/a/one.bin", true, "conformance", Utc::now())
            .await
            .unwrap()
    );
    assert!(
        store
            .set_compressed(&project, &repo, "/a/one.bin", true, "conformance", Utc::now())
            .await
            .unwrap()
    );
    let touched = Utc::now();
    assert!(
        store
            .update_access_date(&project, &repo, "/a/one.bin", touched)
            .await
            .unwrap()
    );
    let one = store
        .find_live(&project, &repo, "/a/one.bin")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(one.expire_date, Some(expiry));
    assert!(one.archived && one.compressed);
    assert_eq!(one.last_access_date, Some(touched));

    // Age-gated tombstoning only matches old files.
    let cutoff = Utc::now() + Duration::seconds(1);
    let swept = store
        .tombstone_files_before(&project, &repo, &NodePath::root(), cutoff, None, Utc::now())
        .await
        .unwrap();
    assert!(swept >= 2, "files older than the cutoff are swept");
    let none_swept = store
        .tombstone_files_before(
            &project,
            &repo,
            &NodePath::root(),
            Utc::now() - Duration::days(365),
            None,
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(none_swept, 0, "an ancient cutoff matches nothing");

    // Physical removal leaves no tombstone behind.
    store
        .insert(file(&project, &repo, "/scratch.bin", 5))
        .await
        .unwrap();
    assert!(store.remove_live(&project, &repo, "/scratch.bin").await.unwrap());
    assert!(store.find_live(&project, &repo, "/scratch.bin").await.unwrap().is_none());
    assert!(
        store
            .list_deleted_points(&project, &repo, "/scratch.bin")
            .await
            .unwrap()
            .is_empty()
    );
}

/// Run the block-store conformance suite against a backend.
///
/// # Panics
/// Panics on any contract violation.
pub async fn run_block_store_conformance_tests(store: &dyn BlockStore) {
    let (project, repo) = scope();
    let path = "/blocks/data.bin";
    let now = Utc::now();

    let committed = BlockNode::new(
        project.clone(),
        repo.clone(),
        path,
        "c".repeat(64),
        0,
        100,
        None,
        "conformance",
        now,
    );
    let mut pending = BlockNode::new(
        project.clone(),
        repo.clone(),
        path,
        "d".repeat(64),
        100,
        200,
        Some("upload-1".to_owned()),
        "conformance",
        now + Duration::milliseconds(1),
    );
    pending.expire_date = Some(now + Duration::hours(1));
    let mut stale = BlockNode::new(
        project.clone(),
        repo.clone(),
        path,
        "e".repeat(64),
        200,
        300,
        Some("upload-2".to_owned()),
        "conformance",
        now + Duration::milliseconds(2),
    );
    stale.expire_date = Some(now - Duration::hours(1));

    store.insert(committed.clone()).await.unwrap();
    store.insert(pending.clone()).await.unwrap();
    store.insert(stale).await.unwrap();

    let visible = store
        .list_range(&project, &repo, path, 0, 300, None, Utc::now())
        .await
        .unwrap();
    assert_eq!(visible.len(), 1, "only the committed block is readable");
    assert_eq!(visible[0].sha256, committed.sha256);

    let own = store
        .list_range(&project, &repo, path, 0, 300, Some("upload-1"), Utc::now())
        .await
        .unwrap();
    assert_eq!(own.len(), 2, "a session sees committed blocks plus its own");

    let foreign = store
        .list_range(&project, &repo, path, 0, 300, Some("upload-2"), Utc::now())
        .await
        .unwrap();
    assert_eq!(foreign.len(), 1, "an expired session sees only committed blocks");

    // Range query is half-open.
    let edge = store
        .list_range(&project, &repo, path, 100, 200, None, Utc::now())
        .await
        .unwrap();
    assert!(edge.is_empty(), "[100,200) does not touch the [0,100) block");

    assert_eq!(
        store
            .commit_upload(&project, &repo, path, "upload-1")
            .await
            .unwrap(),
        1
    );
    let after_commit = store
        .list_range(&project, &repo, path, 0, 300, None, Utc::now())
        .await
        .unwrap();
    assert_eq!(after_commit.len(), 2);
    assert!(
        after_commit.windows(2).all(|w| w[0].created_date <= w[1].created_date),
        "blocks come back in creation order"
    );

    // Tombstone and windowed restore. The restore window is
    // `[created_from, created_before)`; it must cover every
    // created_date stamped above, including the +1ms pending block.
    let deleted_at = now + Duration::milliseconds(5);
    assert_eq!(
        store.tombstone_blocks(&project, &repo, path, deleted_at).await.unwrap(),
        2,
        "stale-session blocks are not tombstoned"
    );
    assert!(
        store
            .list_live(&project, &repo, path)
            .await
            .unwrap()
            .is_empty()
    );
    let restored = store
        .restore_blocks(&project, &repo, path, now, deleted_at)
        .await
        .unwrap();
    assert_eq!(restored, 2);
    assert_eq!(store.list_live(&project, &repo, path).await.unwrap().len(), 2);
}

/// Run the reference-store conformance suite against a backend.
///
/// # Panics
/// Panics on any contract violation.
pub async fn run_reference_store_conformance_tests(store: &dyn ReferenceStore) {
    let sha = "f".repeat(64);

    assert_eq!(store.get_count(&sha, None).await.unwrap(), 0);
    assert_eq!(store.try_increment(&sha, None).await.unwrap(), 1);
    assert_eq!(store.try_increment(&sha, None).await.unwrap(), 2);
    assert_eq!(
        store.try_increment(&sha, Some("cold")).await.unwrap(),
        1,
        "credentials keys count independently"
    );

    let down = store.decrement(&sha, None).await.unwrap();
    assert_eq!((down.count, down.underflow), (1, false));
    let down = store.decrement(&sha, None).await.unwrap();
    assert_eq!((down.count, down.underflow), (0, false));
    let down = store.decrement(&sha, None).await.unwrap();
    assert!(down.underflow, "decrement below zero must flag underflow");
    assert_eq!(down.count, 0, "and clamp the stored count");
    assert_eq!(store.get_count(&sha, Some("cold")).await.unwrap(), 1);
}

/// Run the quota-store conformance suite against a backend.
///
/// # Panics
/// Panics on any contract violation.
pub async fn run_quota_store_conformance_tests(store: &dyn QuotaStore) {
    let (project, repo) = scope();

    let usage = store.get(&project, &repo).await.unwrap();
    assert_eq!((usage.quota, usage.used), (None, 0));

    store.set_quota(&project, &repo, Some(1000)).await.unwrap();
    assert_eq!(store.add_used(&project, &repo, 600).await.unwrap(), 600);
    assert_eq!(store.add_used(&project, &repo, 300).await.unwrap(), 900);

    let usage = store.get(&project, &repo).await.unwrap();
    assert_eq!((usage.quota, usage.used), (Some(1000), 900));

    // Drift shows up as a raw negative; the stored counter clamps.
    assert_eq!(store.add_used(&project, &repo, -1000).await.unwrap(), -100);
    assert_eq!(store.get(&project, &repo).await.unwrap().used, 0);
}
