//! Point-in-time restore on [`NodeService`].
//!
//! A restore is keyed by (path, deletion point): only records
//! tombstoned at exactly that instant come back, so interleaved
//! generations at the same path stay untouched. Folders take a fast
//! bulk path when nothing live stands in the way and fall back to a
//! per-record walk when it does.

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use arbor_core::{Node, NodeEventKind, NodePath, ProjectId, RepoName};
use arbor_store::StoreError;

use crate::error::EngineError;
use crate::requests::{ConflictStrategy, RestoreOptions, RestoreSummary};
use crate::service::NodeService;

struct RestoreContext<'a> {
    project: &'a ProjectId,
    repo: &'a RepoName,
    deleted_at: DateTime<Utc>,
    strategy: ConflictStrategy,
    operator: &'a str,
    summary: RestoreSummary,
}

impl NodeService {
    /// Deletion instants recorded for a path, newest first.
    pub async fn list_deleted_points(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
    ) -> Result<Vec<DateTime<Utc>>, EngineError> {
        let path = NodePath::parse(full_path)?;
        Ok(self
            .nodes
            .list_deleted_points(project, repo, &path.full_path())
            .await?)
    }

    /// The tombstoned record at a path: the named deletion point, or
    /// the latest when none is given.
    pub async fn deleted_detail(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Node>, EngineError> {
        let path = NodePath::parse(full_path)?;
        let at = match deleted_at {
            Some(at) => at,
            None => {
                let points = self
                    .nodes
                    .list_deleted_points(project, repo, &path.full_path())
                    .await?;
                match points.first() {
                    Some(at) => *at,
                    None => return Ok(None),
                }
            }
        };
        Ok(self
            .nodes
            .find_deleted_at(project, repo, &path.full_path(), at)
            .await?)
    }

    /// Restore a deletion point under a path. Restoring the root
    /// replays a whole-repository delete; there is no root record, so
    /// the walk starts at its children.
    #[instrument(name = "node.restore", skip_all, fields(
        project = %project,
        repo = %repo,
        path = full_path,
        deleted_at = %options.deleted_at,
    ))]
    pub async fn restore_node(
        &self,
        project: &ProjectId,
        repo: &RepoName,
        full_path: &str,
        options: RestoreOptions,
        operator: &str,
    ) -> Result<RestoreSummary, EngineError> {
        let path = NodePath::parse(full_path)?;
        let mut ctx = RestoreContext {
            project,
            repo,
            deleted_at: options.deleted_at,
            strategy: options.strategy,
            operator,
            summary: RestoreSummary::default(),
        };
        if path.is_root() {
            self.restore_children(&path, &mut ctx).await?;
        } else {
            self.nodes
                .find_deleted_at(project, repo, &path.full_path(), options.deleted_at)
                .await?
                .ok_or_else(|| {
                    EngineError::NotFound(format!(
                        "no deletion point {} at {path}",
                        options.deleted_at
                    ))
                })?;
            self.restore_path(&path, &mut ctx).await?;
        }
        self.emit(
            NodeEventKind::Restored,
            project,
            repo,
            &path.full_path(),
            operator,
        )
        .await;
        info!(
            restored = ctx.summary.restored,
            skipped = ctx.summary.skipped,
            conflicts = ctx.summary.conflicts,
            "restore finished"
        );
        Ok(ctx.summary)
    }

    async fn restore_path(
        &self,
        path: &NodePath,
        ctx: &mut RestoreContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(record) = self
            .nodes
            .find_deleted_at(ctx.project, ctx.repo, &path.full_path(), ctx.deleted_at)
            .await?
        else {
            return Ok(());
        };

        if let Some(occupant) = self
            .nodes
            .find_live(ctx.project, ctx.repo, &path.full_path())
            .await?
        {
            // Two folders merge: leave the live one, walk into the
            // deleted generation's children.
            if occupant.folder && record.folder {
                return self.restore_children(path, ctx).await;
            }
            match ctx.strategy {
                ConflictStrategy::Skip => {
                    ctx.summary.skipped += 1;
                    return Ok(());
                }
                ConflictStrategy::Failed => {
                    return Err(EngineError::Conflict(format!(
                        "live node blocks restore: {path}"
                    )));
                }
                ConflictStrategy::Overwrite => {
                    self.overwrite_occupant(path, ctx).await?;
                }
            }
        }

        if record.folder {
            self.restore_folder(path, ctx).await
        } else {
            self.restore_file(path, ctx).await
        }
    }

    async fn restore_folder(
        &self,
        path: &NodePath,
        ctx: &mut RestoreContext<'_>,
    ) -> Result<(), EngineError> {
        // Fast path: nothing live below, bring the whole generation
        // back in one store call.
        let live_below = self
            .nodes
            .count_subtree_live(ctx.project, ctx.repo, path, false)
            .await?;
        if live_below == 0 {
            let records = self
                .nodes
                .list_subtree_deleted_at(ctx.project, ctx.repo, path, ctx.deleted_at)
                .await?;
            match self
                .nodes
                .restore_subtree(
                    ctx.project,
                    ctx.repo,
                    path,
                    ctx.deleted_at,
                    ctx.operator,
                    Utc::now(),
                )
                .await
            {
                Ok(count) => {
                    ctx.summary.restored += count;
                    let mut recovered_size = 0;
                    for node in records.iter().filter(|n| !n.folder) {
                        self.restore_node_blocks(node, ctx).await;
                        recovered_size += node.size;
                    }
                    self.quotas
                        .record_usage(ctx.project, ctx.repo, recovered_size)
                        .await?;
                    return Ok(());
                }
                // A writer slipped in under us. Fall through to the
                // per-record walk.
                Err(StoreError::DuplicateKey(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        match self
            .nodes
            .clear_tombstone(
                ctx.project,
                ctx.repo,
                &path.full_path(),
                ctx.deleted_at,
                ctx.operator,
                Utc::now(),
            )
            .await
        {
            Ok(Some(_)) => ctx.summary.restored += 1,
            Ok(None) => {}
            Err(StoreError::DuplicateKey(_)) => match ctx.strategy {
                ConflictStrategy::Skip => {
                    ctx.summary.skipped += 1;
                    return Ok(());
                }
                ConflictStrategy::Failed => {
                    return Err(EngineError::Conflict(format!(
                        "live node blocks restore: {path}"
                    )));
                }
                // The occupant here is a live folder that appeared
                // mid-walk; merge into it.
                ConflictStrategy::Overwrite => {}
            },
            Err(err) => return Err(err.into()),
        }
        self.restore_children(path, ctx).await
    }

    async fn restore_file(
        &self,
        path: &NodePath,
        ctx: &mut RestoreContext<'_>,
    ) -> Result<(), EngineError> {
        let cleared = self
            .nodes
            .clear_tombstone(
                ctx.project,
                ctx.repo,
                &path.full_path(),
                ctx.deleted_at,
                ctx.operator,
                Utc::now(),
            )
            .await;
        let node = match cleared {
            Ok(Some(node)) => node,
            Ok(None) => return Ok(()),
            Err(StoreError::DuplicateKey(_)) => match ctx.strategy {
                ConflictStrategy::Skip => {
                    ctx.summary.skipped += 1;
                    return Ok(());
                }
                ConflictStrategy::Failed => {
                    return Err(EngineError::Conflict(format!(
                        "live node blocks restore: {path}"
                    )));
                }
                ConflictStrategy::Overwrite => {
                    self.overwrite_occupant(path, ctx).await?;
                    match self
                        .nodes
                        .clear_tombstone(
                            ctx.project,
                            ctx.repo,
                            &path.full_path(),
                            ctx.deleted_at,
                            ctx.operator,
                            Utc::now(),
                        )
                        .await
                    {
                        Ok(Some(node)) => node,
                        Ok(None) => return Ok(()),
                        Err(StoreError::DuplicateKey(_)) => {
                            warn!(path = %path, "restore target stays contended, counting conflict");
                            ctx.summary.conflicts += 1;
                            return Ok(());
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            },
            Err(err) => return Err(err.into()),
        };

        if !self.restore_node_blocks(&node, ctx).await {
            // Bring the record back to exactly where it was and move
            // on; the rest of the restore is still worth doing.
            if let Err(err) = self
                .nodes
                .tombstone_one(ctx.project, ctx.repo, &node.full_path, ctx.deleted_at)
                .await
            {
                error!(error = %err, path = %node.full_path, "failed to revert after block restore failure");
            }
            ctx.summary.conflicts += 1;
            return Ok(());
        }
        self.quotas
            .record_usage(ctx.project, ctx.repo, node.size)
            .await?;
        ctx.summary.restored += 1;
        Ok(())
    }

    async fn restore_children(
        &self,
        parent: &NodePath,
        ctx: &mut RestoreContext<'_>,
    ) -> Result<(), EngineError> {
        let child_depth = parent.depth() + 1;
        let records = self
            .nodes
            .list_subtree_deleted_at(ctx.project, ctx.repo, parent, ctx.deleted_at)
            .await?;
        for record in records {
            let Ok(child) = NodePath::parse(&record.full_path) else {
                continue;
            };
            if child.depth() != child_depth {
                continue;
            }
            Box::pin(self.restore_path(&child, ctx)).await?;
        }
        Ok(())
    }

    /// Restore a file's blocks from the window between its creation
    /// and its deletion point. Returns `false` on failure.
    async fn restore_node_blocks(&self, node: &Node, ctx: &RestoreContext<'_>) -> bool {
        match self
            .blocks
            .restore_blocks(
                ctx.project,
                ctx.repo,
                &node.full_path,
                node.created_date,
                ctx.deleted_at,
            )
            .await
        {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, path = %node.full_path, "block restore failed");
                false
            }
        }
    }

    /// Fully delete the live occupant of a path so a restore can take
    /// its place.
    async fn overwrite_occupant(
        &self,
        path: &NodePath,
        ctx: &mut RestoreContext<'_>,
    ) -> Result<(), EngineError> {
        let (deleted_at, count) = self
            .delete_without_decrease(ctx.project, ctx.repo, path)
            .await?;
        if count > 0 {
            let freed = self
                .nodes
                .sum_size_deleted_at(ctx.project, ctx.repo, path, deleted_at)
                .await?;
            self.quotas
                .record_usage(ctx.project, ctx.repo, -freed)
                .await?;
        }
        Ok(())
    }
}
