//! In-memory backends for the Arbor store traits.
//!
//! Node and block collections sit behind one `parking_lot::RwLock`
//! each, so multi-record mutations (tombstone-set, bulk restore) are
//! all-or-nothing. Counters use `DashMap` entries mutated atomically.
//! Intended for tests and single-process embedding.

mod block;
mod node;
mod quota;
mod reference;

pub use block::MemoryBlockStore;
pub use node::MemoryNodeStore;
pub use quota::MemoryQuotaStore;
pub use reference::MemoryReferenceStore;
