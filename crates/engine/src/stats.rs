//! Folder statistics on [`NodeService`].

use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use arbor_core::{NodePath, ProjectId, RepoName};
use arbor_store::ListOptions;

use crate::error::EngineError;
use crate::requests::FolderStats;
use crate::service::NodeService;

impl NodeService {
    /// Compute the size of a node.
    ///
    /// For a file this is its recorded size. For a folder the exact
    /// mode aggregates the live subtree and persists the result into
    /// the folder's cache on the way out. The estimated mode answers
    /// from one level of cached child-folder stats instead: stale
    /// after writes until the next exact pass, but O(children) rather
    /// than O(subtree), which is what keeps root-level dashboards
    /// usable on huge repositories.
    #[instrument(name = "node.compute_size", skip_all, fields(project = %project, repo = %repo, path = full_path, estimated))]
    pub async fn compute_size(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        estimated: bool,
    ) -> Result<FolderStats, EngineError> {
        let path = NodePath::parse(full_path)?;
        if !path.is_root() {
            let node = self
                .nodes
                .find_live(project, repo, &path.full_path())
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("node {project}/{repo}{path}")))?;
            if !node.folder {
                return Ok(FolderStats {
                    size: node.size,
                    file_count: 1,
                    node_count: 1,
                });
            }
        }
        if estimated {
            return self.estimate_folder_stats(project, repo, &path).await;
        }

        let size = self.nodes.sum_size_live(project, repo, &path).await?;
        let file_count = self
            .nodes
            .count_subtree_live(project, repo, &path, true)
            .await?;
        let node_count = self
            .nodes
            .count_subtree_live(project, repo, &path, false)
            .await?;
        if !path.is_root() {
            let persisted = self
                .nodes
                .update_folder_stats(
                    project,
                    repo,
                    &path.full_path(),
                    size,
                    i64::try_from(file_count).unwrap_or(i64::MAX),
                )
                .await?;
            if !persisted {
                warn!(path = %path, "folder vanished before its stats cache was written");
            }
        }
        Ok(FolderStats {
            size,
            file_count,
            node_count,
        })
    }

    /// Count of live files under a node.
    pub async fn count_file_node(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<u64, EngineError> {
        let path = NodePath::parse(full_path)?;
        Ok(self
            .nodes
            .count_subtree_live(project, repo, &path, true)
            .await?)
    }

    /// Total size of live files under a node created before a cutoff.
    /// Sizes what a clean-before pass would free.
    pub async fn compute_size_before(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        before: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        let path = NodePath::parse(full_path)?;
        Ok(self
            .nodes
            .sum_size_live_before(project, repo, &path, before)
            .await?)
    }

    /// One-level estimate: cached child-folder aggregates plus the
    /// direct files. Child folders whose cache was never computed
    /// contribute nothing.
    async fn estimate_folder_stats(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        path: &NodePath,
    ) -> Result<FolderStats, EngineError> {
        let children = self
            .nodes
            .list_children_live(project, repo, path, ListOptions::default())
            .await?;
        let mut stats = FolderStats {
            size: 0,
            file_count: 0,
            node_count: 0,
        };
        for child in children {
            stats.node_count += 1;
            if child.folder {
                stats.size += child.size;
                let cached = child.node_num.unwrap_or(0).max(0) as u64;
                stats.file_count += cached;
                stats.node_count += cached;
            } else {
                stats.size += child.size;
                stats.file_count += 1;
            }
        }
        Ok(stats)
    }
}
