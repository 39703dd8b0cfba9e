//! Read surface of [`NodeService`].

use tracing::instrument;

use arbor_core::{Node, NodePath, ProjectId, RepoName};
use arbor_store::ListOptions;

use crate::error::EngineError;
use crate::requests::ListNodesOptions;
use crate::service::NodeService;

impl NodeService {
    /// The live node at a path.
    #[instrument(name = "node.detail", skip_all, fields(project = %project, repo = %repo, path = full_path))]
    pub async fn node_detail(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<Node, EngineError> {
        let path = NodePath::parse(full_path)?;
        self.nodes
            .find_live(project, repo, &path.full_path())
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("node {project}/{repo}{path}")))
    }

    /// Whether a live node occupies the path.
    pub async fn exists(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<bool, EngineError> {
        let path = NodePath::parse(full_path)?;
        Ok(self
            .nodes
            .find_live(project, repo, &path.full_path())
            .await?
            .is_some())
    }

    /// Live nodes under a folder, one level or the whole subtree.
    #[instrument(name = "node.list", skip_all, fields(project = %project, repo = %repo, path = full_path, deep = options.deep))]
    pub async fn list_children(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        options: ListNodesOptions,
    ) -> Result<Vec<Node>, EngineError> {
        let path = NodePath::parse(full_path)?;
        if !path.is_root() {
            let node = self
                .nodes
                .find_live(project, repo, &path.full_path())
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("node {project}/{repo}{path}")))?;
            if !node.folder {
                return Err(EngineError::Validation(format!("not a folder: {path}")));
            }
        }
        let list_options = ListOptions {
            include_folders: options.include_folders,
            limit: self.config.list_limit,
        };
        if options.deep {
            Ok(self
                .nodes
                .list_subtree_live(project, repo, &path, list_options)
                .await?)
        } else {
            Ok(self
                .nodes
                .list_children_live(project, repo, &path, list_options)
                .await?)
        }
    }

    /// Filter a path list down to those occupied by a live node.
    /// Unparseable entries are dropped, not failed.
    pub async fn list_exist_full_paths(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_paths: &[String],
    ) -> Result<Vec<String>, EngineError> {
        let mut found = Vec::new();
        for raw in full_paths {
            let Ok(path) = NodePath::parse(raw) else {
                continue;
            };
            if self
                .nodes
                .find_live(project, repo, &path.full_path())
                .await?
                .is_some()
            {
                found.push(path.full_path());
            }
        }
        Ok(found)
    }
}
