use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::node::NodeState;
use crate::types::{ProjectId, RepoName};

/// One stored block of a block-structured file.
///
/// Ranges are half-open byte intervals `[start_pos, end_pos)` within the
/// owning node's logical content. Blocks written inside an unfinished
/// multipart upload carry its `upload_id` and stay invisible to reads
/// until the upload is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub repo_name: RepoName,
    pub node_full_path: String,
    pub sha256: String,
    pub start_pos: u64,
    pub end_pos: u64,
    pub upload_id: Option<String>,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub expire_date: Option<DateTime<Utc>>,
    pub state: NodeState,
}

impl BlockNode {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_id: ProjectId,
        repo_name: RepoName,
        node_full_path: impl Into<String>,
        sha256: impl Into<String>,
        start_pos: u64,
        end_pos: u64,
        upload_id: Option<String>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            repo_name,
            node_full_path: node_full_path.into(),
            sha256: sha256.into(),
            start_pos,
            end_pos,
            upload_id,
            created_by: operator.to_owned(),
            created_date: now,
            expire_date: None,
            state: NodeState::Live,
        }
    }

    /// Byte length of this block.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end_pos.saturating_sub(self.start_pos)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end_pos <= self.start_pos
    }

    /// Whether this block overlaps the half-open range `[start, end)`.
    #[must_use]
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start_pos < end && start < self.end_pos
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_date.is_some_and(|expiry| expiry <= now)
    }
}
