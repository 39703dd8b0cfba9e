//! Move and copy on [`NodeService`].
//!
//! A move re-homes the records: the destination keeps the source's
//! creation identity and the source is tombstoned afterwards. A copy
//! mints new records stamped with the operator and the current instant,
//! and takes its own hold on the content reference counts. Neither
//! touches blob bytes; a cross-storage relocation only stamps the
//! credentials keys so the blob layer knows what to reconcile.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use arbor_core::{Node, NodeEventKind, NodePath, RepoInfo};
use arbor_store::{ListOptions, StoreError};

use crate::error::EngineError;
use crate::requests::MoveCopyRequest;
use crate::service::NodeService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelocationKind {
    Move,
    Copy,
}

struct Relocation<'a> {
    kind: RelocationKind,
    request: &'a MoveCopyRequest,
    src_repo: &'a RepoInfo,
    dst_repo: &'a RepoInfo,
    now: DateTime<Utc>,
}

impl Relocation<'_> {
    fn cross_storage(&self) -> bool {
        self.src_repo.effective_credentials_key() != self.dst_repo.effective_credentials_key()
    }
}

impl NodeService {
    /// Move a node (and its subtree) to a new path, possibly in
    /// another repository.
    pub async fn move_node(&self, request: MoveCopyRequest) -> Result<Node, EngineError> {
        self.relocate(request, RelocationKind::Move).await
    }

    /// Copy a node (and its subtree) to a new path, possibly in
    /// another repository.
    pub async fn copy_node(&self, request: MoveCopyRequest) -> Result<Node, EngineError> {
        self.relocate(request, RelocationKind::Copy).await
    }

    #[instrument(name = "node.relocate", skip_all, fields(
        src = %format!("{}/{}{}", request.src_project_id, request.src_repo_name, request.src_full_path),
        dst = %format!("{}/{}{}", request.dst_project_id, request.dst_repo_name, request.dst_full_path),
        kind = ?kind,
    ))]
    async fn relocate(
        &self,
        request: MoveCopyRequest,
        kind: RelocationKind,
    ) -> Result<Node, EngineError> {
        let src_path = NodePath::parse(&request.src_full_path)?;
        if src_path.is_root() {
            return Err(EngineError::Validation(
                "the root cannot be moved or copied".to_owned(),
            ));
        }
        let dst_input = NodePath::parse(&request.dst_full_path)?;

        let src_repo = self
            .resolve_repo(&request.src_project_id, &request.src_repo_name)
            .await?;
        let dst_repo = self
            .resolve_repo(&request.dst_project_id, &request.dst_repo_name)
            .await?;
        for repo in [&src_repo, &dst_repo] {
            if !repo.category.supports_relocation() {
                return Err(EngineError::MethodNotAllowed(format!(
                    "{:?} repositories do not support move or copy",
                    repo.category
                )));
            }
        }

        let src_node = self
            .nodes
            .find_live(&request.src_project_id, &request.src_repo_name, &src_path.full_path())
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "node {}/{}{src_path}",
                    request.src_project_id, request.src_repo_name
                ))
            })?;

        // A live folder destination means "into": append the source name.
        let dst_at_input = self
            .nodes
            .find_live(&request.dst_project_id, &request.dst_repo_name, &dst_input.full_path())
            .await?;
        let dst_path = match &dst_at_input {
            Some(node) if node.folder => dst_input.join(&src_node.name)?,
            _ => dst_input,
        };

        let same_repo = request.src_project_id == request.dst_project_id
            && request.src_repo_name == request.dst_repo_name;
        if same_repo && dst_path == src_path {
            return Ok(src_node);
        }
        if same_repo && src_path.is_ancestor_of(&dst_path) {
            return Err(EngineError::Conflict(
                "cannot relocate a folder into its own subtree".to_owned(),
            ));
        }

        let relocation = Relocation {
            kind,
            request: &request,
            src_repo: &src_repo,
            dst_repo: &dst_repo,
            now: Utc::now(),
        };

        let dst_occupant = self
            .nodes
            .find_live(&request.dst_project_id, &request.dst_repo_name, &dst_path.full_path())
            .await?;
        if let Some(existing) = &dst_occupant {
            match (src_node.folder, existing.folder) {
                (true, false) => {
                    return Err(EngineError::Conflict(format!(
                        "cannot merge a folder into a file: {dst_path}"
                    )));
                }
                (false, true) => {
                    return Err(EngineError::Conflict(format!(
                        "a folder occupies the destination: {dst_path}"
                    )));
                }
                (false, false) => {
                    self.displace_file(&relocation, existing, &dst_path).await?;
                }
                // Folder onto folder merges below.
                (true, true) => {}
            }
        }

        let total_size = if src_node.folder {
            self.nodes
                .sum_size_live(&request.src_project_id, &request.src_repo_name, &src_path)
                .await?
        } else {
            src_node.size
        };
        let adds_usage = kind == RelocationKind::Copy || !same_repo;
        if adds_usage {
            self.quotas
                .ensure_within(&request.dst_project_id, &request.dst_repo_name, total_size)
                .await?;
        }

        self.materialize_ancestors(
            &request.dst_project_id,
            &request.dst_repo_name,
            &dst_path,
            &request.operator,
            relocation.now,
        )
        .await?;

        if src_node.folder {
            if dst_occupant.is_none() {
                self.insert_relocated(&relocation, &src_node, &dst_path).await?;
            }
            let subtree = self
                .nodes
                .list_subtree_live(
                    &request.src_project_id,
                    &request.src_repo_name,
                    &src_path,
                    ListOptions::default(),
                )
                .await?;
            for child in subtree {
                let Ok(child_src) = NodePath::parse(&child.full_path) else {
                    continue;
                };
                let Some(child_dst) = child_src.rebase(&src_path, &dst_path) else {
                    continue;
                };
                let existing = self
                    .nodes
                    .find_live(
                        &request.dst_project_id,
                        &request.dst_repo_name,
                        &child_dst.full_path(),
                    )
                    .await?;
                match (&existing, child.folder) {
                    // Merge keeps the destination folder as is.
                    (Some(node), true) if node.folder => continue,
                    (Some(node), _) if node.folder != child.folder => {
                        return Err(EngineError::Conflict(format!(
                            "file and folder collide while merging: {child_dst}"
                        )));
                    }
                    (Some(node), false) => {
                        self.displace_file(&relocation, node, &child_dst).await?;
                    }
                    _ => {}
                }
                self.insert_relocated(&relocation, &child, &child_dst).await?;
            }
        } else {
            self.insert_relocated(&relocation, &src_node, &dst_path).await?;
        }

        if adds_usage {
            self.quotas
                .record_usage(&request.dst_project_id, &request.dst_repo_name, total_size)
                .await?;
        }
        if kind == RelocationKind::Move {
            if !same_repo {
                self.quotas
                    .record_usage(&request.src_project_id, &request.src_repo_name, -total_size)
                    .await?;
            }
            self.delete_without_decrease(
                &request.src_project_id,
                &request.src_repo_name,
                &src_path,
            )
            .await?;
        }

        let event_kind = match kind {
            RelocationKind::Move => NodeEventKind::Moved {
                dst_project_id: request.dst_project_id.clone(),
                dst_repo_name: request.dst_repo_name.clone(),
                dst_full_path: dst_path.full_path(),
            },
            RelocationKind::Copy => NodeEventKind::Copied {
                dst_project_id: request.dst_project_id.clone(),
                dst_repo_name: request.dst_repo_name.clone(),
                dst_full_path: dst_path.full_path(),
            },
        };
        self.emit(
            event_kind,
            &request.src_project_id,
            &request.src_repo_name,
            &src_path.full_path(),
            &request.operator,
        )
        .await;
        info!(total_size, "relocation finished");

        self.nodes
            .find_live(&request.dst_project_id, &request.dst_repo_name, &dst_path.full_path())
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "node {}/{}{dst_path}",
                    request.dst_project_id, request.dst_repo_name
                ))
            })
    }

    /// Tombstone a live destination file that an overwrite displaces,
    /// releasing its bytes from the destination repository.
    async fn displace_file(
        &self,
        relocation: &Relocation<'_>,
        existing: &Node,
        path: &NodePath,
    ) -> Result<(), EngineError> {
        if !relocation.request.overwrite {
            return Err(EngineError::Conflict(format!(
                "destination exists: {path}"
            )));
        }
        self.delete_without_decrease(
            &relocation.request.dst_project_id,
            &relocation.request.dst_repo_name,
            path,
        )
        .await?;
        self.quotas
            .record_usage(
                &relocation.request.dst_project_id,
                &relocation.request.dst_repo_name,
                -existing.size,
            )
            .await?;
        Ok(())
    }

    /// Write the destination record for one relocated node, duplicate
    /// its blocks, and take the copy's reference-count hold.
    async fn insert_relocated(
        &self,
        relocation: &Relocation<'_>,
        src: &Node,
        dst_path: &NodePath,
    ) -> Result<(), EngineError> {
        let request = relocation.request;
        let mut node = src.clone();
        node.id = Uuid::new_v4();
        node.project_id = request.dst_project_id.clone();
        node.repo_name = request.dst_repo_name.clone();
        node.relocate(dst_path);
        node.last_modified_by = request.operator.clone();
        node.last_modified_date = relocation.now;
        if relocation.kind == RelocationKind::Copy {
            node.created_by = request.operator.clone();
            node.created_date = relocation.now;
        }
        if node.folder {
            // Caches never survive a relocation; stats recompute them.
            node.size = 0;
            node.node_num = None;
        } else if relocation.cross_storage() {
            node.copy_from_credentials_key =
                Some(relocation.src_repo.effective_credentials_key().to_owned());
            node.copy_into_credentials_key =
                Some(relocation.dst_repo.effective_credentials_key().to_owned());
        }

        if let Err(err) = self.nodes.insert(node.clone()).await {
            return match err {
                StoreError::DuplicateKey(p) => {
                    Err(EngineError::Conflict(format!("destination exists: {p}")))
                }
                other => Err(other.into()),
            };
        }
        if node.folder {
            return Ok(());
        }

        for block in self
            .blocks
            .list_live(&request.src_project_id, &request.src_repo_name, &src.full_path)
            .await?
        {
            let mut copy = block.clone();
            copy.id = Uuid::new_v4();
            copy.project_id = request.dst_project_id.clone();
            copy.repo_name = request.dst_repo_name.clone();
            copy.node_full_path = node.full_path.clone();
            if relocation.kind == RelocationKind::Copy {
                copy.created_by = request.operator.clone();
                copy.created_date = relocation.now;
            }
            self.blocks.insert(copy).await?;
        }

        if relocation.kind == RelocationKind::Copy && !node.is_placeholder() {
            if let Some(sha256) = node.sha256.as_deref() {
                self.references
                    .increment(sha256, relocation.dst_repo.credentials_key.as_deref())
                    .await?;
            }
        }
        Ok(())
    }
}
