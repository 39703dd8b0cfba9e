use async_trait::async_trait;

use arbor_core::{ProjectId, RepoName};

use crate::error::StoreError;

/// Quota configuration and usage counter for one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuotaUsage {
    /// Byte limit; `None` means unlimited.
    pub quota: Option<i64>,
    /// Bytes currently accounted to the repository.
    pub used: i64,
}

/// Per-repository quota collection.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn get(&self, project: &ProjectId, repo: &RepoName) -> Result<QuotaUsage, StoreError>;

    async fn set_quota(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        quota: Option<i64>,
    ) -> Result<(), StoreError>;

    /// Atomically add `delta` bytes to the usage counter and return
    /// the raw new value. The stored value is clamped at zero; a
    /// negative return tells the caller the counter drifted.
    async fn add_used(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        delta: i64,
    ) -> Result<i64, StoreError>;
}
