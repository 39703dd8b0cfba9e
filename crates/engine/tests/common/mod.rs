#![allow(dead_code)]

use std::sync::Arc;

use arbor_core::{ProjectId, RepoCategory, RepoInfo, RepoName};
use arbor_engine::{
    CreateNodeRequest, EngineConfig, MemoryEventSink, NodeService, StaticRepositoryResolver,
};
use arbor_store_memory::{
    MemoryBlockStore, MemoryNodeStore, MemoryQuotaStore, MemoryReferenceStore,
};

pub const OPERATOR: &str = "alice";

/// Engine wired over fresh memory backends, with three registered
/// repositories: `generic` (local, default storage), `cold-store`
/// (local, "cold" storage credentials), `mirror` (remote).
pub struct Harness {
    pub nodes: Arc<MemoryNodeStore>,
    pub blocks: Arc<MemoryBlockStore>,
    pub references: Arc<MemoryReferenceStore>,
    pub quotas: Arc<MemoryQuotaStore>,
    pub resolver: Arc<StaticRepositoryResolver>,
    pub events: Arc<MemoryEventSink>,
    pub service: NodeService,
    pub project: ProjectId,
    pub repo: RepoName,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let nodes = Arc::new(MemoryNodeStore::new());
        let blocks = Arc::new(MemoryBlockStore::new());
        let references = Arc::new(MemoryReferenceStore::new());
        let quotas = Arc::new(MemoryQuotaStore::new());
        let resolver = Arc::new(StaticRepositoryResolver::new());
        let events = Arc::new(MemoryEventSink::new());
        let project = ProjectId::new("p1");
        let repo = RepoName::new("generic");
        resolver.register(RepoInfo {
            project_id: project.clone(),
            name: repo.clone(),
            category: RepoCategory::Local,
            credentials_key: None,
        });
        resolver.register(RepoInfo {
            project_id: project.clone(),
            name: RepoName::new("cold-store"),
            category: RepoCategory::Local,
            credentials_key: Some("cold".to_owned()),
        });
        resolver.register(RepoInfo {
            project_id: project.clone(),
            name: RepoName::new("mirror"),
            category: RepoCategory::Remote,
            credentials_key: None,
        });
        let service = NodeService::new(
            nodes.clone(),
            blocks.clone(),
            references.clone(),
            quotas.clone(),
            resolver.clone(),
            events.clone(),
            EngineConfig::default(),
        );
        Self {
            nodes,
            blocks,
            references,
            quotas,
            resolver,
            events,
            service,
            project,
            repo,
        }
    }

    /// Another service over the same backends, with different tuning.
    pub fn service_with(&self, config: EngineConfig) -> NodeService {
        NodeService::new(
            self.nodes.clone(),
            self.blocks.clone(),
            self.references.clone(),
            self.quotas.clone(),
            self.resolver.clone(),
            self.events.clone(),
            config,
        )
    }

    pub fn file_request(&self, path: &str, size: i64, seed: u8) -> CreateNodeRequest {
        CreateNodeRequest::file(
            self.project.clone(),
            self.repo.clone(),
            path,
            size,
            sha(seed),
            md5(seed),
            OPERATOR,
        )
    }

    pub async fn used_bytes(&self) -> i64 {
        self.service
            .quotas()
            .usage(&self.project, &self.repo)
            .await
            .unwrap()
            .used
    }
}

pub fn sha(seed: u8) -> String {
    format!("{seed:02x}").repeat(32)
}

pub fn md5(seed: u8) -> String {
    format!("{seed:02x}").repeat(16)
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
