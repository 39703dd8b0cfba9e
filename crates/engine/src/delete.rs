//! Delete operations on [`NodeService`]. Deletes are soft: records are
//! tombstoned with one shared instant per call, never removed.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use arbor_core::{NodeEventKind, NodePath, ProjectId, RepoName};

use crate::error::EngineError;
use crate::requests::DeleteResult;
use crate::service::NodeService;

impl NodeService {
    /// Tombstone a node and its subtree.
    #[instrument(name = "node.delete", skip_all, fields(project = %project, repo = %repo, path = full_path))]
    pub async fn delete_by_path(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        operator: &str,
    ) -> Result<DeleteResult, EngineError> {
        let path = NodePath::parse(full_path)?;
        if path.is_root() {
            return Err(EngineError::Validation(
                "the root cannot be deleted".to_owned(),
            ));
        }
        let deleted_at = Utc::now();
        let deleted_count = self.tombstone_with_blocks(project, repo, &path, deleted_at).await?;
        if deleted_count == 0 {
            return Err(EngineError::NotFound(format!("node {project}/{repo}{path}")));
        }
        let freed_size = self
            .nodes
            .sum_size_deleted_at(project, repo, &path, deleted_at)
            .await?;
        self.quotas.record_usage(project, repo, -freed_size).await?;
        self.emit(NodeEventKind::Deleted, project, repo, &path.full_path(), operator)
            .await;
        info!(deleted_count, freed_size, "subtree deleted");
        Ok(DeleteResult {
            deleted_at,
            deleted_count,
            freed_size,
        })
    }

    /// Tombstone several subtrees with one shared instant. The whole
    /// list is validated before the first tombstone, and a path
    /// covered by another path in the batch folds into it so its
    /// bytes count once. Paths that match nothing are skipped; one
    /// event per subtree that deleted something.
    #[instrument(name = "node.delete_batch", skip_all, fields(project = %project, repo = %repo, count = full_paths.len()))]
    pub async fn delete_by_paths(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_paths: &[String],
        operator: &str,
    ) -> Result<DeleteResult, EngineError> {
        let mut roots: Vec<NodePath> = Vec::new();
        for raw in full_paths {
            let path = NodePath::parse(raw)?;
            if path.is_root() {
                return Err(EngineError::Validation(
                    "the root cannot be deleted".to_owned(),
                ));
            }
            if roots.iter().any(|kept| *kept == path || kept.is_ancestor_of(&path)) {
                continue;
            }
            roots.retain(|kept| !path.is_ancestor_of(kept));
            roots.push(path);
        }

        // The kept roots are pairwise disjoint, so each subtree sum
        // contributes once.
        let deleted_at = Utc::now();
        let mut deleted_count = 0;
        let mut freed_size = 0;
        for path in &roots {
            let count = self.tombstone_with_blocks(project, repo, path, deleted_at).await?;
            if count == 0 {
                continue;
            }
            deleted_count += count;
            freed_size += self
                .nodes
                .sum_size_deleted_at(project, repo, path, deleted_at)
                .await?;
            self.emit(NodeEventKind::Deleted, project, repo, &path.full_path(), operator)
                .await;
        }
        self.quotas.record_usage(project, repo, -freed_size).await?;
        Ok(DeleteResult {
            deleted_at,
            deleted_count,
            freed_size,
        })
    }

    /// Tombstone files under `root` last modified before the cutoff
    /// (and, when given, last accessed before `accessed_before`).
    /// Folders are left in place.
    #[instrument(name = "node.delete_before", skip_all, fields(project = %project, repo = %repo, path = root_full_path, before = %modified_before))]
    pub async fn delete_before_date(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        root_full_path: &str,
        modified_before: DateTime<Utc>,
        accessed_before: Option<DateTime<Utc>>,
        operator: &str,
    ) -> Result<DeleteResult, EngineError> {
        let root = NodePath::parse(root_full_path)?;
        let deleted_at = Utc::now();
        let deleted_count = self
            .nodes
            .tombstone_files_before(
                project,
                repo,
                &root,
                modified_before,
                accessed_before,
                deleted_at,
            )
            .await?;
        let freed_size = self
            .nodes
            .sum_size_deleted_at(project, repo, &root, deleted_at)
            .await?;
        for node in self
            .nodes
            .list_subtree_deleted_at(project, repo, &root, deleted_at)
            .await?
        {
            self.blocks
                .tombstone_blocks(project, repo, &node.full_path, deleted_at)
                .await?;
        }
        self.quotas.record_usage(project, repo, -freed_size).await?;
        self.emit(
            NodeEventKind::Cleaned {
                before: modified_before,
            },
            project,
            repo,
            &root.full_path(),
            operator,
        )
        .await;
        info!(deleted_count, freed_size, "aged files deleted");
        Ok(DeleteResult {
            deleted_at,
            deleted_count,
            freed_size,
        })
    }

    /// Tombstone a subtree without touching the usage counter. Used
    /// when the bytes stay accounted elsewhere (overwrite, move).
    pub(crate) async fn delete_without_decrease(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        path: &NodePath,
    ) -> Result<(DateTime<Utc>, u64), EngineError> {
        let deleted_at = Utc::now();
        let count = self.tombstone_with_blocks(project, repo, path, deleted_at).await?;
        Ok((deleted_at, count))
    }

    /// Tombstone the subtree, then cascade the same instant to the
    /// blocks of every file that went down with it.
    async fn tombstone_with_blocks(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        path: &NodePath,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, EngineError> {
        let count = self
            .nodes
            .tombstone_subtree(project, repo, path, deleted_at)
            .await?;
        if count == 0 {
            return Ok(0);
        }
        for node in self
            .nodes
            .list_subtree_deleted_at(project, repo, path, deleted_at)
            .await?
        {
            if !node.folder {
                self.blocks
                    .tombstone_blocks(project, repo, &node.full_path, deleted_at)
                    .await?;
            }
        }
        Ok(count)
    }
}
