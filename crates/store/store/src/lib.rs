//! Persistence trait abstractions for the Arbor node tree.
//!
//! Each trait models one logical collection: node records, block
//! records, content reference counts, and repository quota counters.
//! Backends implement these traits and validate themselves against the
//! suites in [`testing`].

pub mod block;
pub mod error;
pub mod node;
pub mod quota;
pub mod reference;
pub mod testing;

pub use block::BlockStore;
pub use error::StoreError;
pub use node::{ListOptions, NodeStore};
pub use quota::{QuotaStore, QuotaUsage};
pub use reference::{DecrementOutcome, ReferenceStore};
