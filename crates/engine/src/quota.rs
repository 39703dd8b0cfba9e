use std::sync::Arc;

use tracing::{instrument, warn};

use arbor_core::{ProjectId, RepoName};
use arbor_store::{QuotaStore, QuotaUsage};

use crate::error::EngineError;

/// Per-repository quota accounting.
///
/// The check and the usage update are deliberately separate calls: the
/// check guards the write, the update records what actually happened.
/// A small over-admission window between them is accepted.
#[derive(Clone)]
pub struct QuotaService {
    store: Arc<dyn QuotaStore>,
}

impl QuotaService {
    #[must_use]
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self { store }
    }

    /// Fail when adding `delta` bytes would exceed the configured
    /// quota. Non-positive deltas and unlimited repositories pass.
    #[instrument(name = "quota.ensure_within", skip_all, fields(project = %project, repo = %repo, delta))]
    pub async fn ensure_within(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        delta: i64,
    ) -> Result<(), EngineError> {
        if delta <= 0 {
            return Ok(());
        }
        let usage = self.store.get(project, repo).await?;
        if let Some(quota) = usage.quota
            && usage.used + delta > quota
        {
            return Err(EngineError::QuotaExceeded {
                used: usage.used,
                quota,
            });
        }
        Ok(())
    }

    /// Record `delta` bytes of usage. A counter driven below zero is a
    /// reconciliation signal, not a failure: it is logged and the
    /// stored value clamps at zero.
    pub async fn record_usage(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        delta: i64,
    ) -> Result<(), EngineError> {
        let raw = self.store.add_used(project, repo, delta).await?;
        if raw < 0 {
            warn!(
                project = %project,
                repo = %repo,
                delta,
                raw,
                "repository usage counter went negative, clamped to zero"
            );
        }
        Ok(())
    }

    pub async fn usage(
        &self,
        project: &ProjectId,
        repo: &RepoName,
    ) -> Result<QuotaUsage, EngineError> {
        Ok(self.store.get(project, repo).await?)
    }

    pub async fn set_quota(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        quota: Option<i64>,
    ) -> Result<(), EngineError> {
        Ok(self.store.set_quota(project, repo, quota).await?)
    }
}
