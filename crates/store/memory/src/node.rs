use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use arbor_core::{Node, NodePath, NodeState, ProjectId, RepoName};
use arbor_store::{ListOptions, NodeStore, StoreError};

/// In-memory [`NodeStore`]. One lock guards the whole collection, so
/// every multi-record mutation commits atomically.
#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    nodes: RwLock<Vec<Node>>,
}

impl MemoryNodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_scope(node: &Node, project: &ProjectId, repo: &RepoName) -> bool {
    node.project_id == *project && node.repo_name == *repo
}

fn passes(node: &Node, options: ListOptions) -> bool {
    options.include_folders || !node.folder
}

fn truncated(mut nodes: Vec<Node>, options: ListOptions) -> Vec<Node> {
    if let Some(limit) = options.limit {
        nodes.truncate(limit);
    }
    nodes
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn insert(&self, node: Node) -> Result<(), StoreError> {
        let mut nodes = self.nodes.write();
        let occupied = nodes.iter().any(|existing| {
            existing.is_live()
                && in_scope(existing, &node.project_id, &node.repo_name)
                && existing.full_path == node.full_path
        });
        if occupied {
            return Err(StoreError::DuplicateKey(node.full_path));
        }
        nodes.push(node);
        Ok(())
    }

    async fn find_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<Option<Node>, StoreError> {
        let nodes = self.nodes.read();
        Ok(nodes
            .iter()
            .find(|n| n.is_live() && in_scope(n, project, repo) && n.full_path == full_path)
            .cloned())
    }

    async fn find_deleted_at(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<Option<Node>, StoreError> {
        let nodes = self.nodes.read();
        Ok(nodes
            .iter()
            .find(|n| {
                in_scope(n, project, repo)
                    && n.full_path == full_path
                    && n.deleted_at() == Some(deleted_at)
            })
            .cloned())
    }

    async fn list_deleted_points(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let nodes = self.nodes.read();
        let mut points: Vec<_> = nodes
            .iter()
            .filter(|n| in_scope(n, project, repo) && n.full_path == full_path)
            .filter_map(Node::deleted_at)
            .collect();
        points.sort_unstable_by(|a, b| b.cmp(a));
        Ok(points)
    }

    async fn list_children_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        parent: &NodePath,
        options: ListOptions,
    ) -> Result<Vec<Node>, StoreError> {
        let prefix = parent.dir_prefix();
        let nodes = self.nodes.read();
        let mut children: Vec<_> = nodes
            .iter()
            .filter(|n| {
                n.is_live() && in_scope(n, project, repo) && n.path == prefix && passes(n, options)
            })
            .cloned()
            .collect();
        children.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Ok(truncated(children, options))
    }

    async fn list_subtree_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        options: ListOptions,
    ) -> Result<Vec<Node>, StoreError> {
        let root_path = root.full_path();
        let nodes = self.nodes.read();
        let mut subtree: Vec<_> = nodes
            .iter()
            .filter(|n| {
                n.is_live()
                    && in_scope(n, project, repo)
                    && n.full_path != root_path
                    && root.matches_subtree(&n.full_path)
                    && passes(n, options)
            })
            .cloned()
            .collect();
        subtree.sort_unstable_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(truncated(subtree, options))
    }

    async fn count_subtree_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        files_only: bool,
    ) -> Result<u64, StoreError> {
        let root_path = root.full_path();
        let nodes = self.nodes.read();
        let count = nodes
            .iter()
            .filter(|n| {
                n.is_live()
                    && in_scope(n, project, repo)
                    && n.full_path != root_path
                    && root.matches_subtree(&n.full_path)
                    && (!files_only || !n.folder)
            })
            .count();
        Ok(count as u64)
    }

    async fn sum_size_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
    ) -> Result<i64, StoreError> {
        let nodes = self.nodes.read();
        Ok(nodes
            .iter()
            .filter(|n| {
                n.is_live()
                    && in_scope(n, project, repo)
                    && !n.folder
                    && root.matches_subtree(&n.full_path)
            })
            .map(|n| n.size)
            .sum())
    }

    async fn sum_size_live_before(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        before: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let nodes = self.nodes.read();
        Ok(nodes
            .iter()
            .filter(|n| {
                n.is_live()
                    && in_scope(n, project, repo)
                    && !n.folder
                    && n.created_date < before
                    && root.matches_subtree(&n.full_path)
            })
            .map(|n| n.size)
            .sum())
    }

    async fn tombstone_subtree(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut nodes = self.nodes.write();
        let mut count = 0;
        for node in nodes.iter_mut() {
            if node.is_live() && in_scope(node, project, repo) && root.matches_subtree(&node.full_path)
            {
                node.state = NodeState::Deleted { at };
                count += 1;
            }
        }
        Ok(count)
    }

    async fn tombstone_one(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.write();
        for node in nodes.iter_mut() {
            if node.is_live() && in_scope(node, project, repo) && node.full_path == full_path {
                node.state = NodeState::Deleted { at };
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn tombstone_files_before(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        modified_before: DateTime<Utc>,
        accessed_before: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut nodes = self.nodes.write();
        let mut count = 0;
        for node in nodes.iter_mut() {
            let stale_access = accessed_before
                .is_none_or(|cutoff| node.last_access_date.is_none_or(|accessed| accessed < cutoff));
            if node.is_live()
                && in_scope(node, project, repo)
                && !node.folder
                && node.last_modified_date < modified_before
                && stale_access
                && root.matches_subtree(&node.full_path)
            {
                node.state = NodeState::Deleted { at };
                count += 1;
            }
        }
        Ok(count)
    }

    async fn clear_tombstone(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        deleted_at: DateTime<Utc>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Node>, StoreError> {
        let mut nodes = self.nodes.write();
        let occupied = nodes
            .iter()
            .any(|n| n.is_live() && in_scope(n, project, repo) && n.full_path == full_path);
        let target = nodes.iter_mut().find(|n| {
            in_scope(n, project, repo)
                && n.full_path == full_path
                && n.deleted_at() == Some(deleted_at)
        });
        let Some(node) = target else {
            return Ok(None);
        };
        if occupied {
            return Err(StoreError::DuplicateKey(full_path.to_owned()));
        }
        node.state = NodeState::Live;
        node.last_modified_by = operator.to_owned();
        node.last_modified_date = now;
        Ok(Some(node.clone()))
    }

    async fn restore_subtree(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        deleted_at: DateTime<Utc>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut nodes = self.nodes.write();
        let targets: Vec<String> = nodes
            .iter()
            .filter(|n| {
                in_scope(n, project, repo)
                    && n.deleted_at() == Some(deleted_at)
                    && root.matches_subtree(&n.full_path)
            })
            .map(|n| n.full_path.clone())
            .collect();
        if let Some(conflict) = nodes.iter().find(|n| {
            n.is_live() && in_scope(n, project, repo) && targets.contains(&n.full_path)
        }) {
            return Err(StoreError::DuplicateKey(conflict.full_path.clone()));
        }
        let mut count = 0;
        for node in nodes.iter_mut() {
            if in_scope(node, project, repo)
                && node.deleted_at() == Some(deleted_at)
                && root.matches_subtree(&node.full_path)
            {
                node.state = NodeState::Live;
                node.last_modified_by = operator.to_owned();
                node.last_modified_date = now;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn list_subtree_deleted_at(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        deleted_at: DateTime<Utc>,
    ) -> Result<Vec<Node>, StoreError> {
        let nodes = self.nodes.read();
        let mut subtree: Vec<_> = nodes
            .iter()
            .filter(|n| {
                in_scope(n, project, repo)
                    && n.deleted_at() == Some(deleted_at)
                    && root.matches_subtree(&n.full_path)
            })
            .cloned()
            .collect();
        subtree.sort_unstable_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(subtree)
    }

    async fn sum_size_deleted_at(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root: &NodePath,
        deleted_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let nodes = self.nodes.read();
        Ok(nodes
            .iter()
            .filter(|n| {
                in_scope(n, project, repo)
                    && !n.folder
                    && n.deleted_at() == Some(deleted_at)
                    && root.matches_subtree(&n.full_path)
            })
            .map(|n| n.size)
            .sum())
    }

    async fn update_folder_stats(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        size: i64,
        node_num: i64,
    ) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.write();
        for node in nodes.iter_mut() {
            if node.is_live()
                && in_scope(node, project, repo)
                && node.folder
                && node.full_path == full_path
            {
                node.size = size;
                node.node_num = Some(node_num);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn set_expire_date(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        expire_date: Option<DateTime<Utc>>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.write();
        for node in nodes.iter_mut() {
            if node.is_live() && in_scope(node, project, repo) && node.full_path == full_path {
                node.expire_date = expire_date;
                node.last_modified_by = operator.to_owned();
                node.last_modified_date = now;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn update_access_date(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.write();
        for node in nodes.iter_mut() {
            if node.is_live() && in_scope(node, project, repo) && node.full_path == full_path {
                node.last_access_date = Some(at);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn set_archived(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        archived: bool,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.write();
        for node in nodes.iter_mut() {
            if node.is_live() && in_scope(node, project, repo) && node.full_path == full_path {
                node.archived = archived;
                node.last_modified_by = operator.to_owned();
                node.last_modified_date = now;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn set_compressed(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        compressed: bool,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.write();
        for node in nodes.iter_mut() {
            if node.is_live() && in_scope(node, project, repo) && node.full_path == full_path {
                node.compressed = compressed;
                node.last_modified_by = operator.to_owned();
                node.last_modified_date = now;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn remove_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|n| {
            !(n.is_live() && in_scope(n, project, repo) && n.full_path == full_path)
        });
        Ok(nodes.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::testing::run_node_store_conformance_tests;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryNodeStore::new();
        run_node_store_conformance_tests(&store).await;
    }

    #[tokio::test]
    async fn scoping_isolates_repositories() {
        let store = MemoryNodeStore::new();
        let path = NodePath::parse("/shared").unwrap();
        let node = Node::new_folder(
            ProjectId::new("p1"),
            RepoName::new("r1"),
            &path,
            "tester",
            Utc::now(),
        );
        store.insert(node).await.unwrap();
        let other = store
            .find_live(&ProjectId::new("p1"), &RepoName::new("r2"), "/shared")
            .await
            .unwrap();
        assert!(other.is_none());
    }
}
