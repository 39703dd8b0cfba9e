//! Node attribute updates: expiry, access stamps, archive and
//! compression flags.

use chrono::{Duration, Utc};
use tracing::instrument;

use arbor_core::{NodePath, ProjectId, RepoName};

use crate::error::EngineError;
use crate::service::NodeService;

impl NodeService {
    /// Re-stamp a node's expiry from a TTL in days; zero clears it.
    #[instrument(name = "node.update_expires", skip_all, fields(project = %project, repo = %repo, path = full_path, days))]
    pub async fn update_expires(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        days: u32,
        operator: &str,
    ) -> Result<(), EngineError> {
        let path = NodePath::parse(full_path)?;
        let now = Utc::now();
        let expire_date = (days > 0).then(|| now + Duration::days(i64::from(days)));
        let updated = self
            .nodes
            .set_expire_date(project, repo, &path.full_path(), expire_date, operator, now)
            .await?;
        if updated {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("node {project}/{repo}{path}")))
        }
    }

    /// Touch a live node's last access instant.
    pub async fn update_access_date(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<(), EngineError> {
        let path = NodePath::parse(full_path)?;
        let updated = self
            .nodes
            .update_access_date(project, repo, &path.full_path(), Utc::now())
            .await?;
        if updated {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("node {project}/{repo}{path}")))
        }
    }

    /// Mark a file's content as moved to archive storage.
    pub async fn archive_node(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        operator: &str,
    ) -> Result<(), EngineError> {
        self.set_archive_flag(project, repo, full_path, true, operator)
            .await
    }

    /// Clear the archive mark after content came back.
    pub async fn restore_archived(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        operator: &str,
    ) -> Result<(), EngineError> {
        self.set_archive_flag(project, repo, full_path, false, operator)
            .await
    }

    /// Mark a file's content as stored compressed.
    pub async fn compress_node(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        operator: &str,
    ) -> Result<(), EngineError> {
        self.set_compress_flag(project, repo, full_path, true, operator)
            .await
    }

    /// Clear the compression mark.
    pub async fn uncompress_node(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        operator: &str,
    ) -> Result<(), EngineError> {
        self.set_compress_flag(project, repo, full_path, false, operator)
            .await
    }

    async fn set_archive_flag(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        archived: bool,
        operator: &str,
    ) -> Result<(), EngineError> {
        let path = self.require_file(project, repo, full_path).await?;
        let updated = self
            .nodes
            .set_archived(project, repo, &path.full_path(), archived, operator, Utc::now())
            .await?;
        if updated {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("node {project}/{repo}{path}")))
        }
    }

    async fn set_compress_flag(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        compressed: bool,
        operator: &str,
    ) -> Result<(), EngineError> {
        let path = self.require_file(project, repo, full_path).await?;
        let updated = self
            .nodes
            .set_compressed(project, repo, &path.full_path(), compressed, operator, Utc::now())
            .await?;
        if updated {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("node {project}/{repo}{path}")))
        }
    }

    async fn require_file(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<NodePath, EngineError> {
        let path = NodePath::parse(full_path)?;
        let node = self
            .nodes
            .find_live(project, repo, &path.full_path())
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("node {project}/{repo}{path}")))?;
        if node.folder {
            return Err(EngineError::Validation(format!(
                "operation applies to files only: {path}"
            )));
        }
        Ok(path)
    }
}
