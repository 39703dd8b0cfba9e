use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use arbor_core::{BlockNode, NodeState, ProjectId, RepoName};
use arbor_store::{BlockStore, StoreError};

/// In-memory [`BlockStore`].
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<Vec<BlockNode>>,
}

impl MemoryBlockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_scope(block: &BlockNode, project: &ProjectId, repo: &RepoName, path: &str) -> bool {
    block.project_id == *project && block.repo_name == *repo && block.node_full_path == path
}

/// Session visibility: committed blocks always, a caller's own
/// unexpired session blocks when it names the session.
fn visible_to(block: &BlockNode, upload_id: Option<&str>, now: DateTime<Utc>) -> bool {
    match block.upload_id.as_deref() {
        None => true,
        Some(session) => upload_id == Some(session) && !block.is_expired(now),
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn insert(&self, block: BlockNode) -> Result<(), StoreError> {
        self.blocks.write().push(block);
        Ok(())
    }

    async fn list_range(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        start: u64,
        end: u64,
        upload_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BlockNode>, StoreError> {
        let blocks = self.blocks.read();
        let mut hits: Vec<_> = blocks
            .iter()
            .filter(|b| {
                b.state.is_live()
                    && in_scope(b, project, repo, node_full_path)
                    && b.overlaps(start, end)
                    && visible_to(b, upload_id, now)
            })
            .cloned()
            .collect();
        hits.sort_by_key(|b| b.created_date);
        Ok(hits)
    }

    async fn list_live(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
    ) -> Result<Vec<BlockNode>, StoreError> {
        let blocks = self.blocks.read();
        let mut hits: Vec<_> = blocks
            .iter()
            .filter(|b| {
                b.state.is_live()
                    && in_scope(b, project, repo, node_full_path)
                    && b.upload_id.is_none()
            })
            .cloned()
            .collect();
        hits.sort_by_key(|b| b.created_date);
        Ok(hits)
    }

    async fn commit_upload(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        upload_id: &str,
    ) -> Result<u64, StoreError> {
        let mut blocks = self.blocks.write();
        let mut count = 0;
        for block in blocks.iter_mut() {
            if in_scope(block, project, repo, node_full_path)
                && block.upload_id.as_deref() == Some(upload_id)
            {
                block.upload_id = None;
                block.expire_date = None;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn tombstone_blocks(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut blocks = self.blocks.write();
        let mut count = 0;
        for block in blocks.iter_mut() {
            if block.state.is_live()
                && in_scope(block, project, repo, node_full_path)
                && block.upload_id.is_none()
            {
                block.state = NodeState::Deleted { at };
                count += 1;
            }
        }
        Ok(count)
    }

    async fn restore_blocks(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        node_full_path: &str,
        created_from: DateTime<Utc>,
        created_before: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut blocks = self.blocks.write();
        let mut count = 0;
        for block in blocks.iter_mut() {
            if !block.state.is_live()
                && in_scope(block, project, repo, node_full_path)
                && block.created_date >= created_from
                && block.created_date < created_before
            {
                block.state = NodeState::Live;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::testing::run_block_store_conformance_tests;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryBlockStore::new();
        run_block_store_conformance_tests(&store).await;
    }
}
