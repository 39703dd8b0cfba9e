use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use arbor_core::{ProjectId, RepoInfo, RepoName};

use crate::error::EngineError;

/// Resolves repository descriptors. Repository management lives
/// outside the engine; this is the seam it is consumed through.
#[async_trait]
pub trait RepositoryResolver: Send + Sync {
    async fn find_repo(
        &self,
        project: &ProjectId,
        repo: &RepoName,
    ) -> Result<Option<RepoInfo>, EngineError>;
}

/// Map-backed resolver for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct StaticRepositoryResolver {
    repos: RwLock<HashMap<(ProjectId, RepoName), RepoInfo>>,
}

impl StaticRepositoryResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, repo: RepoInfo) {
        self.repos
            .write()
            .insert((repo.project_id.clone(), repo.name.clone()), repo);
    }
}

#[async_trait]
impl RepositoryResolver for StaticRepositoryResolver {
    async fn find_repo(
        &self,
        project: &ProjectId,
        repo: &RepoName,
    ) -> Result<Option<RepoInfo>, EngineError> {
        Ok(self
            .repos
            .read()
            .get(&(project.clone(), repo.clone()))
            .cloned())
    }
}
