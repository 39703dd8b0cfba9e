use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arbor_core::{MetadataEntry, ProjectId, RepoName};

/// Input for [`NodeService::create_node`](crate::NodeService::create_node).
#[derive(Debug, Clone)]
pub struct CreateNodeRequest {
    pub project_id: ProjectId,
    pub repo_name: RepoName,
    pub full_path: String,
    pub folder: bool,
    pub size: i64,
    pub sha256: Option<String>,
    pub md5: Option<String>,
    /// Replace an existing live file at the path instead of failing.
    pub overwrite: bool,
    /// Days until expiry; zero means never.
    pub expires_days: u32,
    pub metadata: Vec<MetadataEntry>,
    pub operator: String,
}

impl CreateNodeRequest {
    /// A file create with the fields every caller must supply.
    #[must_use]
    pub fn file(
        project_id: ProjectId,
        repo_name: RepoName,
        full_path: impl Into<String>,
        size: i64,
        sha256: impl Into<String>,
        md5: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            repo_name,
            full_path: full_path.into(),
            folder: false,
            size,
            sha256: Some(sha256.into()),
            md5: Some(md5.into()),
            overwrite: false,
            expires_days: 0,
            metadata: Vec::new(),
            operator: operator.into(),
        }
    }

    /// A folder create.
    #[must_use]
    pub fn folder(
        project_id: ProjectId,
        repo_name: RepoName,
        full_path: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            repo_name,
            full_path: full_path.into(),
            folder: true,
            size: 0,
            sha256: None,
            md5: None,
            overwrite: false,
            expires_days: 0,
            metadata: Vec::new(),
            operator: operator.into(),
        }
    }
}

/// Input for [`NodeService::link`](crate::NodeService::link).
#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub project_id: ProjectId,
    pub repo_name: RepoName,
    pub full_path: String,
    pub target_project_id: ProjectId,
    pub target_repo_name: RepoName,
    pub target_full_path: String,
    /// Verify the target exists (and is a file) before linking.
    pub check_target: bool,
    pub overwrite: bool,
    pub operator: String,
}

/// Input for move and copy.
#[derive(Debug, Clone)]
pub struct MoveCopyRequest {
    pub src_project_id: ProjectId,
    pub src_repo_name: RepoName,
    pub src_full_path: String,
    pub dst_project_id: ProjectId,
    pub dst_repo_name: RepoName,
    pub dst_full_path: String,
    /// Replace live files colliding at the destination.
    pub overwrite: bool,
    pub operator: String,
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// The single instant stamped on every tombstone of this call.
    pub deleted_at: DateTime<Utc>,
    pub deleted_count: u64,
    /// Bytes released from the repository usage counter.
    pub freed_size: i64,
}

/// How a restore treats a live occupant at a target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictStrategy {
    /// Leave the occupant, skip the record (and its subtree).
    Skip,
    /// Delete the occupant, then restore.
    Overwrite,
    /// Abort the whole restore.
    Failed,
}

/// Input for a point-in-time restore.
#[derive(Debug, Clone, Copy)]
pub struct RestoreOptions {
    /// The deletion point to restore, as listed by
    /// [`NodeService::list_deleted_points`](crate::NodeService::list_deleted_points).
    pub deleted_at: DateTime<Utc>,
    pub strategy: ConflictStrategy,
}

/// Counters reported by a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreSummary {
    pub restored: u64,
    pub skipped: u64,
    pub conflicts: u64,
}

/// Options for child and subtree listings.
#[derive(Debug, Clone, Copy)]
pub struct ListNodesOptions {
    pub include_folders: bool,
    /// Recurse into the whole subtree instead of one level.
    pub deep: bool,
}

impl Default for ListNodesOptions {
    fn default() -> Self {
        Self {
            include_folders: true,
            deep: false,
        }
    }
}

/// Aggregated folder statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderStats {
    pub size: i64,
    pub file_count: u64,
    pub node_count: u64,
}

/// Input for adding one block to a node.
#[derive(Debug, Clone)]
pub struct BlockSpec {
    pub sha256: String,
    pub start_pos: u64,
    pub end_pos: u64,
    /// Upload session the block belongs to, with its expiry. Blocks
    /// stay invisible to other readers until the session commits.
    pub upload_id: Option<String>,
    pub session_expires: Option<DateTime<Utc>>,
}
