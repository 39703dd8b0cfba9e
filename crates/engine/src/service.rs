use std::sync::Arc;

use chrono::Utc;

use arbor_core::{NodeEvent, NodeEventKind, ProjectId, RepoInfo, RepoName};
use arbor_store::{BlockStore, NodeStore, QuotaStore, ReferenceStore};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::EventSink;
use crate::quota::QuotaService;
use crate::reference::FileReferenceService;
use crate::resolver::RepositoryResolver;

/// The node-tree operation hub.
///
/// Holds the store backends and collaborators; the operations live in
/// `impl NodeService` blocks split across this crate's modules
/// (create, delete, restore, relocation, stats, attributes).
#[derive(Clone)]
pub struct NodeService {
    pub(crate) nodes: Arc<dyn NodeStore>,
    pub(crate) blocks: Arc<dyn BlockStore>,
    pub(crate) references: FileReferenceService,
    pub(crate) quotas: QuotaService,
    pub(crate) repos: Arc<dyn RepositoryResolver>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) config: EngineConfig,
}

impl NodeService {
    #[must_use]
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        blocks: Arc<dyn BlockStore>,
        references: Arc<dyn ReferenceStore>,
        quotas: Arc<dyn QuotaStore>,
        repos: Arc<dyn RepositoryResolver>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            nodes,
            blocks,
            references: FileReferenceService::new(references),
            quotas: QuotaService::new(quotas),
            repos,
            events,
            config,
        }
    }

    /// Reference-count accounting, for embedders that need it directly.
    #[must_use]
    pub fn references(&self) -> &FileReferenceService {
        &self.references
    }

    /// Quota accounting, for embedders that need it directly.
    #[must_use]
    pub fn quotas(&self) -> &QuotaService {
        &self.quotas
    }

    pub(crate) async fn resolve_repo(
        &self,
        project: &ProjectId,
        repo: &RepoName,
    ) -> Result<RepoInfo, EngineError> {
        self.repos
            .find_repo(project, repo)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("repository {project}/{repo}")))
    }

    pub(crate) async fn emit(
        &self,
        kind: NodeEventKind,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        operator: &str,
    ) {
        let event = NodeEvent::new(
            kind,
            project.clone(),
            repo.clone(),
            full_path,
            operator,
            Utc::now(),
        );
        self.events.publish(event).await;
    }
}
