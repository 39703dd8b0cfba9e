//! Create and link operations on [`NodeService`].

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use arbor_core::{
    METADATA_KEY_LINK_FULL_PATH, METADATA_KEY_LINK_PROJECT, METADATA_KEY_LINK_REPO,
    FAKE_MD5, FAKE_SHA256, MetadataEntry, Node, NodePath, NodeEventKind, RepoInfo,
    metadata::sanitize_caller_metadata,
};
use arbor_store::StoreError;

use crate::error::EngineError;
use crate::requests::{CreateNodeRequest, LinkRequest};
use crate::service::NodeService;

impl NodeService {
    /// Create a file or folder node.
    ///
    /// Missing ancestors are materialized as folders. Creating an
    /// existing folder is idempotent; creating over an existing file
    /// requires `overwrite`, which tombstones the old generation
    /// first. The write is checked against a time budget after it
    /// commits; an overrun is compensated and surfaced as a timeout.
    pub async fn create_node(&self, request: CreateNodeRequest) -> Result<Node, EngineError> {
        self.create_inner(request, self.config.allow_system_metadata)
            .await
    }

    /// Create a link node pointing at another node.
    ///
    /// The link carries the placeholder content hash, so it never
    /// touches reference counts; the target coordinates ride along as
    /// system metadata.
    #[instrument(name = "node.link", skip_all, fields(
        project = %request.project_id,
        repo = %request.repo_name,
        path = %request.full_path,
    ))]
    pub async fn link(&self, request: LinkRequest) -> Result<Node, EngineError> {
        let target_path = NodePath::parse(&request.target_full_path)?;
        if request.check_target {
            let target = self
                .nodes
                .find_live(
                    &request.target_project_id,
                    &request.target_repo_name,
                    &target_path.full_path(),
                )
                .await?
                .ok_or_else(|| {
                    EngineError::NotFound(format!(
                        "link target {}/{}{}",
                        request.target_project_id, request.target_repo_name, target_path
                    ))
                })?;
            if target.folder {
                return Err(EngineError::Validation(
                    "link target is a folder".to_owned(),
                ));
            }
        }
        let metadata = vec![
            MetadataEntry::system(
                METADATA_KEY_LINK_PROJECT,
                request.target_project_id.as_str(),
            ),
            MetadataEntry::system(METADATA_KEY_LINK_REPO, request.target_repo_name.as_str()),
            MetadataEntry::system(METADATA_KEY_LINK_FULL_PATH, target_path.full_path()),
        ];
        let create = CreateNodeRequest {
            project_id: request.project_id,
            repo_name: request.repo_name,
            full_path: request.full_path,
            folder: false,
            size: 0,
            sha256: Some(FAKE_SHA256.to_owned()),
            md5: Some(FAKE_MD5.to_owned()),
            overwrite: request.overwrite,
            expires_days: 0,
            metadata,
            operator: request.operator,
        };
        self.create_inner(create, true).await
    }

    #[instrument(name = "node.create", skip_all, fields(
        project = %request.project_id,
        repo = %request.repo_name,
        path = %request.full_path,
        folder = request.folder,
    ))]
    async fn create_inner(
        &self,
        request: CreateNodeRequest,
        allow_system_metadata: bool,
    ) -> Result<Node, EngineError> {
        let started = Instant::now();
        let path = NodePath::parse(&request.full_path)?;
        if path.is_root() {
            return Err(EngineError::Validation(
                "the root cannot be created".to_owned(),
            ));
        }
        if !request.folder {
            validate_file_fields(&request)?;
        }
        let repo = self
            .resolve_repo(&request.project_id, &request.repo_name)
            .await?;
        let project = request.project_id.clone();
        let repo_name = request.repo_name.clone();
        let now = Utc::now();

        // Conflict handling at the target path. An overwritten file is
        // tombstoned up front and remembered so a later compensation
        // can bring it back.
        let mut overwritten: Option<(Node, DateTime<Utc>)> = None;
        if let Some(existing) = self
            .nodes
            .find_live(&project, &repo_name, &path.full_path())
            .await?
        {
            if existing.folder && request.folder {
                return Ok(existing);
            }
            if !request.overwrite {
                return Err(EngineError::Conflict(format!(
                    "node already exists: {path}"
                )));
            }
            if existing.folder || request.folder {
                return Err(EngineError::Conflict(format!(
                    "cannot overwrite between file and folder: {path}"
                )));
            }
            let deleted_at = Utc::now();
            self.nodes
                .tombstone_one(&project, &repo_name, &path.full_path(), deleted_at)
                .await?;
            self.blocks
                .tombstone_blocks(&project, &repo_name, &path.full_path(), deleted_at)
                .await?;
            self.quotas
                .record_usage(&project, &repo_name, -existing.size)
                .await?;
            overwritten = Some((existing, deleted_at));
        }

        if !request.folder {
            self.quotas
                .ensure_within(&project, &repo_name, request.size)
                .await?;
        }

        let created_ancestors = self
            .materialize_ancestors(&project, &repo_name, &path, &request.operator, now)
            .await?;

        let metadata = sanitize_caller_metadata(request.metadata, allow_system_metadata);
        let mut node = if request.folder {
            Node::new_folder(
                project.clone(),
                repo_name.clone(),
                &path,
                &request.operator,
                now,
            )
        } else {
            // Validated above.
            let sha256 = request.sha256.clone().unwrap_or_default();
            let md5 = request.md5.clone().unwrap_or_default();
            Node::new_file(
                project.clone(),
                repo_name.clone(),
                &path,
                request.size,
                sha256,
                md5,
                Vec::new(),
                &request.operator,
                now,
            )
        };
        node.metadata = metadata;
        if request.expires_days > 0 {
            node.expire_date = Some(now + Duration::days(i64::from(request.expires_days)));
        }

        if let Err(err) = self.nodes.insert(node.clone()).await {
            return match err {
                StoreError::DuplicateKey(p) => {
                    Err(EngineError::Conflict(format!("node already exists: {p}")))
                }
                other => Err(other.into()),
            };
        }

        let mut counted_reference = false;
        if !node.folder && !node.is_placeholder() {
            if let Some(sha256) = node.sha256.as_deref() {
                self.references
                    .increment(sha256, repo.credentials_key.as_deref())
                    .await?;
                counted_reference = true;
            }
        }
        if !node.folder {
            self.quotas
                .record_usage(&project, &repo_name, node.size)
                .await?;
        }

        let elapsed = started.elapsed();
        if elapsed > self.config.create_budget {
            warn!(
                ?elapsed,
                budget = ?self.config.create_budget,
                "create overran its budget, compensating"
            );
            self.compensate_create(
                &repo,
                &node,
                &created_ancestors,
                counted_reference,
                overwritten.as_ref(),
            )
            .await;
            return Err(EngineError::Timeout {
                elapsed,
                budget: self.config.create_budget,
            });
        }

        self.emit(
            NodeEventKind::Created,
            &project,
            &repo_name,
            &node.full_path,
            &request.operator,
        )
        .await;
        info!(size = node.size, "node created");
        Ok(node)
    }

    /// Insert folder records for every missing ancestor of `path`.
    /// Returns the ancestors actually created, top down. An ancestor
    /// occupied by a live file is a conflict.
    pub(crate) async fn materialize_ancestors(
        &self,
        project: &arbor_core::ProjectId,
        repo_name: &arbor_core::RepoName,
        path: &NodePath,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<NodePath>, EngineError> {
        let mut created = Vec::new();
        for ancestor in path.ancestors() {
            match self
                .nodes
                .find_live(project, repo_name, &ancestor.full_path())
                .await?
            {
                Some(node) if node.folder => {}
                Some(_) => {
                    return Err(EngineError::Conflict(format!(
                        "ancestor is a file: {ancestor}"
                    )));
                }
                None => {
                    let folder = Node::new_folder(
                        project.clone(),
                        repo_name.clone(),
                        &ancestor,
                        operator,
                        now,
                    );
                    match self.nodes.insert(folder).await {
                        Ok(()) => created.push(ancestor),
                        // A racing writer got there first.
                        Err(StoreError::DuplicateKey(_)) => {}
                        Err(err) => return Err(err.into()),
                    }
                }
            }
        }
        Ok(created)
    }

    /// Best-effort unwind of a committed create. Failures are logged;
    /// a reconciliation sweep catches what this misses.
    async fn compensate_create(
        &self,
        repo: &RepoInfo,
        node: &Node,
        created_ancestors: &[NodePath],
        counted_reference: bool,
        overwritten: Option<&(Node, DateTime<Utc>)>,
    ) {
        let project = &node.project_id;
        let repo_name = &node.repo_name;
        if let Err(err) = self.nodes.remove_live(project, repo_name, &node.full_path).await {
            warn!(error = %err, path = %node.full_path, "compensation: node removal failed");
        }
        if !node.folder {
            if let Err(err) = self
                .quotas
                .record_usage(project, repo_name, -node.size)
                .await
            {
                warn!(error = %err, "compensation: usage revert failed");
            }
        }
        if counted_reference {
            if let Some(sha256) = node.sha256.as_deref() {
                if let Err(err) = self
                    .references
                    .decrement(sha256, repo.credentials_key.as_deref())
                    .await
                {
                    warn!(error = %err, "compensation: reference revert failed");
                }
            }
        }
        // Deepest first; stop at the first ancestor that still has
        // content, everything above it does too.
        for ancestor in created_ancestors.iter().rev() {
            match self
                .nodes
                .count_subtree_live(project, repo_name, ancestor, false)
                .await
            {
                Ok(0) => {
                    if let Err(err) = self
                        .nodes
                        .remove_live(project, repo_name, &ancestor.full_path())
                        .await
                    {
                        warn!(error = %err, path = %ancestor, "compensation: ancestor removal failed");
                    }
                }
                Ok(_) => break,
                Err(err) => {
                    warn!(error = %err, "compensation: ancestor check failed");
                    break;
                }
            }
        }
        if let Some((old, deleted_at)) = overwritten {
            match self
                .nodes
                .clear_tombstone(
                    project,
                    repo_name,
                    &old.full_path,
                    *deleted_at,
                    &old.last_modified_by,
                    Utc::now(),
                )
                .await
            {
                Ok(Some(restored)) => {
                    if let Err(err) = self
                        .blocks
                        .restore_blocks(
                            project,
                            repo_name,
                            &restored.full_path,
                            restored.created_date,
                            *deleted_at,
                        )
                        .await
                    {
                        warn!(error = %err, "compensation: block restore failed");
                    }
                    if let Err(err) = self.quotas.record_usage(project, repo_name, old.size).await {
                        warn!(error = %err, "compensation: usage restore failed");
                    }
                }
                Ok(None) => {
                    warn!(path = %old.full_path, "compensation: overwritten generation not found");
                }
                Err(err) => {
                    warn!(error = %err, path = %old.full_path, "compensation: overwrite revert failed");
                }
            }
        }
    }
}

fn validate_file_fields(request: &CreateNodeRequest) -> Result<(), EngineError> {
    if request.size < 0 {
        return Err(EngineError::Validation("size must not be negative".to_owned()));
    }
    let sha256 = request
        .sha256
        .as_deref()
        .ok_or_else(|| EngineError::Validation("file create requires sha256".to_owned()))?;
    if sha256.len() != 64 || !sha256.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EngineError::Validation(
            "sha256 must be 64 hex characters".to_owned(),
        ));
    }
    let md5 = request
        .md5
        .as_deref()
        .ok_or_else(|| EngineError::Validation("file create requires md5".to_owned()))?;
    if md5.len() != 32 || !md5.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EngineError::Validation(
            "md5 must be 32 hex characters".to_owned(),
        ));
    }
    Ok(())
}
