//! Node-tree metadata operations for the Arbor artifact repository.
//!
//! The engine presents a virtual filesystem over flat record
//! collections: every file and folder is one record keyed by
//! `(project, repo, full_path)`, deletes tombstone records instead of
//! removing them, and any recorded deletion point can be restored.
//! Blob bytes never pass through here; content is tracked by hash and
//! reference count only.
//!
//! [`NodeService`] is the hub: construct it over [`arbor_store`]
//! backends plus a [`RepositoryResolver`] and an [`EventSink`], then
//! call the operations. [`BlockService`] manages block-range records
//! for block-structured files over the same collections.

pub mod blocks;
pub mod config;
pub mod error;
pub mod events;
pub mod quota;
pub mod reference;
pub mod requests;
pub mod resolver;
pub mod service;

mod attributes;
mod create;
mod delete;
mod move_copy;
mod read;
mod restore;
mod stats;

pub use blocks::BlockService;
pub use config::EngineConfig;
pub use error::EngineError;
pub use events::{EventSink, MemoryEventSink, NoopEventSink};
pub use quota::QuotaService;
pub use reference::FileReferenceService;
pub use requests::{
    BlockSpec, ConflictStrategy, CreateNodeRequest, DeleteResult, FolderStats, LinkRequest,
    ListNodesOptions, MoveCopyRequest, RestoreOptions, RestoreSummary,
};
pub use resolver::{RepositoryResolver, StaticRepositoryResolver};
pub use service::NodeService;
