use async_trait::async_trait;
use chrono::{DateTime, Utc};

use arbor_core::{BlockNode, ProjectId, RepoName};

use crate::error::StoreError;

/// Block record collection.
///
/// Blocks belong to a node path within a repository. Several blocks
/// may cover overlapping ranges; readers resolve overlap by creation
/// order. Tombstoning mirrors the node lifecycle.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn insert(&self, block: BlockNode) -> Result<(), StoreError>;

    /// Live blocks of a node overlapping the half-open byte range
    /// `[start, end)`, ordered by creation instant.
    ///
    /// Blocks tagged with an uncommitted upload session are excluded
    /// unless `upload_id` names that session; expired sessions are
    /// excluded regardless.
    async fn list_range(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        start: u64,
        end: u64,
        upload_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BlockNode>, StoreError>;

    /// All live committed blocks of a node, ordered by creation
    /// instant.
    async fn list_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
    ) -> Result<Vec<BlockNode>, StoreError>;

    /// Commit an upload session: clear `upload_id` and expiry on every
    /// block of the node tagged with the session. Returns the number
    /// of blocks committed.
    async fn commit_upload(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        upload_id: &str,
    ) -> Result<u64, StoreError>;

    /// Tombstone every live block of a node with one shared deletion
    /// instant. Returns the number of blocks tombstoned.
    async fn tombstone_blocks(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Restore tombstoned blocks of a node created inside the
    /// half-open window `[created_from, created_before)`. Returns the
    /// number of blocks restored.
    async fn restore_blocks(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        created_from: DateTime<Utc>,
        created_before: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}
