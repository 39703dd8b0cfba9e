use async_trait::async_trait;
use dashmap::DashMap;

use arbor_core::{ProjectId, RepoName};
use arbor_store::{QuotaStore, QuotaUsage, StoreError};

type RepoKey = (ProjectId, RepoName);

/// In-memory [`QuotaStore`].
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    usage: DashMap<RepoKey, QuotaUsage>,
}

impl MemoryQuotaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn get(&self, project: &ProjectId, repo: &RepoName) -> Result<QuotaUsage, StoreError> {
        Ok(self
            .usage
            .get(&(project.clone(), repo.clone()))
            .map_or_else(QuotaUsage::default, |entry| *entry))
    }

    async fn set_quota(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        quota: Option<i64>,
    ) -> Result<(), StoreError> {
        self.usage
            .entry((project.clone(), repo.clone()))
            .or_default()
            .quota = quota;
        Ok(())
    }

    async fn add_used(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut entry = self.usage.entry((project.clone(), repo.clone())).or_default();
        let raw = entry.used + delta;
        entry.used = raw.max(0);
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::testing::run_quota_store_conformance_tests;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryQuotaStore::new();
        run_quota_store_conformance_tests(&store).await;
    }
}
