use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ProjectId, RepoName};

/// What happened to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeEventKind {
    Created,
    Deleted,
    Moved {
        dst_project_id: ProjectId,
        dst_repo_name: RepoName,
        dst_full_path: String,
    },
    Copied {
        dst_project_id: ProjectId,
        dst_repo_name: RepoName,
        dst_full_path: String,
    },
    Restored,
    /// Bulk removal of files older than a cutoff.
    Cleaned { before: DateTime<Utc> },
}

/// A domain event emitted after a committed node mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    pub id: Uuid,
    pub kind: NodeEventKind,
    pub project_id: ProjectId,
    pub repo_name: RepoName,
    pub full_path: String,
    pub operator: String,
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent {
    #[must_use]
    pub fn new(
        kind: NodeEventKind,
        project_id: ProjectId,
        repo_name: RepoName,
        full_path: impl Into<String>,
        operator: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            project_id,
            repo_name,
            full_path: full_path.into(),
            operator: operator.to_owned(),
            timestamp,
        }
    }
}
