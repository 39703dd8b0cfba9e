use async_trait::async_trait;
use chrono::{DateTime, Utc};

use arbor_core::{Node, NodePath, ProjectId, RepoName};

use crate::error::StoreError;

/// Options for child and subtree listings.
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    /// Include folder records alongside files.
    pub include_folders: bool,
    /// Upper bound on returned records; `None` means unbounded.
    pub limit: Option<usize>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_folders: true,
            limit: None,
        }
    }
}

/// Node record collection.
///
/// Implementations must be `Send + Sync` and safe for concurrent
/// access. Live uniqueness is the backend's invariant: at most one
/// live record per `(project, repo, full_path)`, enforced so that a
/// racing second writer observes [`StoreError::DuplicateKey`]. Any
/// number of tombstoned records may share a path, keyed by their
/// deletion instant.
///
/// Multi-record mutations (`tombstone_subtree`, `restore_subtree`)
/// must be all-or-nothing within this collection.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Insert a record. Fails with [`StoreError::DuplicateKey`] when a
    /// live record already occupies the path.
    async fn insert(&self, node: Node) -> Result<(), StoreError>;

    /// The live record at an exact path, if any.
    async fn find_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<Option<Node>, StoreError>;

    /// The tombstoned record at an exact path with an exact deletion
    /// instant, if any.
    async fn find_deleted_at(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<Option<Node>, StoreError>;

    /// Deletion instants recorded for a path, newest first.
    async fn list_deleted_points(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<Vec<DateTime<Utc>>, StoreError>;

    /// Live records directly inside `parent`, name order.
    async fn list_children_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        parent: &NodePath,
        options: ListOptions,
    ) -> Result<Vec<Node>, StoreError>;

    /// Live records at `root` and below (excluding the root record
    /// itself), path order.
    async fn list_subtree_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        options: ListOptions,
    ) -> Result<Vec<Node>, StoreError>;

    /// Count live records under `root`, excluding the root record.
    async fn count_subtree_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        files_only: bool,
    ) -> Result<u64, StoreError>;

    /// Sum of live file sizes at `root` and below.
    async fn sum_size_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
    ) -> Result<i64, StoreError>;

    /// Sum of live file sizes at `root` and below, restricted to files
    /// created strictly before `before`.
    async fn sum_size_live_before(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        before: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Tombstone the record at `root` and every live descendant with
    /// one shared deletion instant. Returns the number of records
    /// tombstoned. All-or-nothing.
    async fn tombstone_subtree(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Tombstone exactly one live record. Returns `false` if no live
    /// record occupies the path.
    async fn tombstone_one(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Tombstone live file records under `root` whose last
    /// modification is before `modified_before` (and, when given,
    /// whose last access is before `accessed_before`). One shared
    /// deletion instant. Folders are never matched.
    async fn tombstone_files_before(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        modified_before: DateTime<Utc>,
        accessed_before: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Compare-and-swap restore of one record: the record must still
    /// be tombstoned at exactly `deleted_at` when the flip to live
    /// happens. Returns the restored record, or `None` when no record
    /// matches. Fails with [`StoreError::DuplicateKey`] when a live
    /// record already occupies the path.
    async fn clear_tombstone(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        deleted_at: DateTime<Utc>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Node>, StoreError>;

    /// Bulk restore of every record at `root` and below tombstoned at
    /// exactly `deleted_at`. Fails with [`StoreError::DuplicateKey`]
    /// (restoring nothing) when any target path has a live occupant.
    async fn restore_subtree(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        deleted_at: DateTime<Utc>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Records at `root` and below tombstoned at exactly `deleted_at`,
    /// path order (the root record included when it matches).
    async fn list_subtree_deleted_at(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        deleted_at: DateTime<Utc>,
    ) -> Result<Vec<Node>, StoreError>;

    /// Sum of file sizes at `root` and below tombstoned at exactly
    /// `deleted_at`.
    async fn sum_size_deleted_at(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        deleted_at: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Persist a folder's cached aggregate size and live-file count.
    /// Returns `false` if no live folder record occupies the path.
    async fn update_folder_stats(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        size: i64,
        node_num: i64,
    ) -> Result<bool, StoreError>;

    /// Set or clear the expiry of a live record.
    async fn set_expire_date(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        expire_date: Option<DateTime<Utc>>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Touch the last access instant of a live record.
    async fn update_access_date(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Flip the archived flag on a live record.
    async fn set_archived(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        archived: bool,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Flip the compressed flag on a live record.
    async fn set_compressed(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        compressed: bool,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Physically remove one live record, leaving no tombstone. Used
    /// only to unwind a write that must not remain observable.
    async fn remove_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<bool, StoreError>;
}
