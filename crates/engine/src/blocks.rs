//! Block-range metadata for block-structured files.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use arbor_core::{BlockNode, NodePath, ProjectId, RepoName};
use arbor_store::{BlockStore, NodeStore};

use crate::error::EngineError;
use crate::requests::BlockSpec;
use crate::service::NodeService;

/// Manages block records of a file node. Shares the block collection
/// with [`NodeService`], which cascades tombstones and restores.
#[derive(Clone)]
pub struct BlockService {
    nodes: Arc<dyn NodeStore>,
    blocks: Arc<dyn BlockStore>,
}

impl BlockService {
    #[must_use]
    pub fn new(nodes: Arc<dyn NodeStore>, blocks: Arc<dyn BlockStore>) -> Self {
        Self { nodes, blocks }
    }

    /// A [`BlockService`] over the collections a [`NodeService`]
    /// already holds.
    #[must_use]
    pub fn for_service(service: &NodeService) -> Self {
        Self {
            nodes: Arc::clone(&service.nodes),
            blocks: Arc::clone(&service.blocks),
        }
    }

    /// Record one block of a live file node.
    #[instrument(name = "block.add", skip_all, fields(project = %project, repo = %repo, path = node_full_path))]
    pub async fn add_block(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        spec: BlockSpec,
        operator: &str,
    ) -> Result<BlockNode, EngineError> {
        let path = NodePath::parse(node_full_path)?;
        if spec.end_pos <= spec.start_pos {
            return Err(EngineError::Validation(
                "block range must be non-empty".to_owned(),
            ));
        }
        if spec.sha256.len() != 64 || !spec.sha256.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(EngineError::Validation(
                "sha256 must be 64 hex characters".to_owned(),
            ));
        }
        let node = self
            .nodes
            .find_live(project, repo, &path.full_path())
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("node {project}/{repo}{path}")))?;
        if node.folder {
            return Err(EngineError::Validation(format!(
                "blocks attach to files only: {path}"
            )));
        }
        let mut block = BlockNode::new(
            project.clone(),
            repo.clone(),
            path.full_path(),
            spec.sha256,
            spec.start_pos,
            spec.end_pos,
            spec.upload_id,
            operator,
            Utc::now(),
        );
        if block.upload_id.is_some() {
            block.expire_date = spec.session_expires;
        }
        self.blocks.insert(block.clone()).await?;
        Ok(block)
    }

    /// Blocks of a node overlapping `[start, end)`, in creation order.
    /// Within an upload session, the caller sees its own uncommitted
    /// blocks too.
    pub async fn list_range(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        start: u64,
        end: u64,
        upload_id: Option<&str>,
    ) -> Result<Vec<BlockNode>, EngineError> {
        let path = NodePath::parse(node_full_path)?;
        self.nodes
            .find_live(project, repo, &path.full_path())
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("node {project}/{repo}{path}")))?;
        Ok(self
            .blocks
            .list_range(project, repo, &path.full_path(), start, end, upload_id, Utc::now())
            .await?)
    }

    /// Commit an upload session, making its blocks visible to every
    /// reader.
    #[instrument(name = "block.commit_upload", skip_all, fields(project = %project, repo = %repo, path = node_full_path, upload_id))]
    pub async fn commit_upload(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        upload_id: &str,
    ) -> Result<u64, EngineError> {
        let path = NodePath::parse(node_full_path)?;
        let committed = self
            .blocks
            .commit_upload(project, repo, &path.full_path(), upload_id)
            .await?;
        info!(committed, "upload session committed");
        Ok(committed)
    }
}
