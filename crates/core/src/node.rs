use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::{MetadataEntry, metadata_value};
use crate::path::NodePath;
use crate::types::{ProjectId, RepoName};

/// Sentinel content hash for nodes without a directly stored blob
/// (links, streamed/virtual files). Never reference-counted.
pub const FAKE_SHA256: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Sentinel MD5 paired with [`FAKE_SHA256`].
pub const FAKE_MD5: &str = "00000000000000000000000000000000";

/// System metadata key: project of a link target.
pub const METADATA_KEY_LINK_PROJECT: &str = "link_project";
/// System metadata key: repository of a link target.
pub const METADATA_KEY_LINK_REPO: &str = "link_repo";
/// System metadata key: full path of a link target.
pub const METADATA_KEY_LINK_FULL_PATH: &str = "link_full_path";

/// Lifecycle state of a node record.
///
/// A tombstoned node keeps its exact deletion instant; several
/// tombstoned records may share a full path, distinguished only by
/// that instant (the "deletion point").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeState {
    Live,
    Deleted { at: DateTime<Utc> },
}

impl NodeState {
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    #[must_use]
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Live => None,
            Self::Deleted { at } => Some(*at),
        }
    }
}

/// One file or folder record in the virtual tree.
///
/// `path` (parent directory, trailing separator) and `name` are
/// materialized from `full_path` on every write; they are derived
/// fields, not caller input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub repo_name: RepoName,
    pub path: String,
    pub name: String,
    pub full_path: String,
    pub folder: bool,
    /// Byte size for files; cached aggregate for folders (may be stale).
    pub size: i64,
    /// Cached live-file count for folders; `None` until computed.
    pub node_num: Option<i64>,
    pub sha256: Option<String>,
    pub md5: Option<String>,
    pub metadata: Vec<MetadataEntry>,
    pub state: NodeState,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub last_modified_by: String,
    pub last_modified_date: DateTime<Utc>,
    pub last_access_date: Option<DateTime<Utc>>,
    pub expire_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub compressed: bool,
    /// Clusters that own a replica of this node, if replicated.
    #[serde(default)]
    pub cluster_names: Option<Vec<String>>,
    /// Set when the content was copied across storage credentials.
    pub copy_from_credentials_key: Option<String>,
    pub copy_into_credentials_key: Option<String>,
}

impl Node {
    /// Build a folder record at `path`.
    #[must_use]
    pub fn new_folder(
        project_id: ProjectId,
        repo_name: RepoName,
        path: &NodePath,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            repo_name,
            path: path.parent_dir(),
            name: path.name().to_owned(),
            full_path: path.full_path(),
            folder: true,
            size: 0,
            node_num: None,
            sha256: None,
            md5: None,
            metadata: Vec::new(),
            state: NodeState::Live,
            created_by: operator.to_owned(),
            created_date: now,
            last_modified_by: operator.to_owned(),
            last_modified_date: now,
            last_access_date: None,
            expire_date: None,
            archived: false,
            compressed: false,
            cluster_names: None,
            copy_from_credentials_key: None,
            copy_into_credentials_key: None,
        }
    }

    /// Build a file record at `path`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new_file(
        project_id: ProjectId,
        repo_name: RepoName,
        path: &NodePath,
        size: i64,
        sha256: String,
        md5: String,
        metadata: Vec<MetadataEntry>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            repo_name,
            path: path.parent_dir(),
            name: path.name().to_owned(),
            full_path: path.full_path(),
            folder: false,
            size,
            node_num: None,
            sha256: Some(sha256),
            md5: Some(md5),
            metadata,
            state: NodeState::Live,
            created_by: operator.to_owned(),
            created_date: now,
            last_modified_by: operator.to_owned(),
            last_modified_date: now,
            last_access_date: Some(now),
            expire_date: None,
            archived: false,
            compressed: false,
            cluster_names: None,
            copy_from_credentials_key: None,
            copy_into_credentials_key: None,
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    #[must_use]
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.state.deleted_at()
    }

    /// Whether this node's content is the placeholder hash. Placeholder
    /// nodes have no stored blob and never participate in reference
    /// counting.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.sha256.as_deref() == Some(FAKE_SHA256)
    }

    /// Whether this node is a link to another node.
    #[must_use]
    pub fn is_link(&self) -> bool {
        metadata_value(&self.metadata, METADATA_KEY_LINK_FULL_PATH).is_some()
    }

    /// Re-derive `path`/`name`/`full_path` from a normalized path.
    pub fn relocate(&mut self, path: &NodePath) {
        self.path = path.parent_dir();
        self.name = path.name().to_owned();
        self.full_path = path.full_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_at(path: &str) -> Node {
        Node::new_file(
            ProjectId::new("p"),
            RepoName::new("r"),
            &NodePath::parse(path).unwrap(),
            42,
            "a".repeat(64),
            "b".repeat(32),
            Vec::new(),
            "tester",
            Utc::now(),
        )
    }

    #[test]
    fn derived_fields_come_from_the_path() {
        let node = file_at("/docs/readme.md");
        assert_eq!(node.path, "/docs/");
        assert_eq!(node.name, "readme.md");
        assert_eq!(node.full_path, "/docs/readme.md");
        assert!(!node.folder);
        assert!(node.is_live());
    }

    #[test]
    fn placeholder_detection() {
        let mut node = file_at("/x");
        assert!(!node.is_placeholder());
        node.sha256 = Some(FAKE_SHA256.to_owned());
        assert!(node.is_placeholder());
    }

    #[test]
    fn state_round_trip() {
        let at = Utc::now();
        let state = NodeState::Deleted { at };
        assert_eq!(state.deleted_at(), Some(at));
        let json = serde_json::to_string(&state).unwrap();
        let back: NodeState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn relocate_rederives_materialized_fields() {
        let mut node = file_at("/a/b.txt");
        node.relocate(&NodePath::parse("/c/d/e.txt").unwrap());
        assert_eq!(node.path, "/c/d/");
        assert_eq!(node.name, "e.txt");
        assert_eq!(node.full_path, "/c/d/e.txt");
    }
}
