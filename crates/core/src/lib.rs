pub mod block;
pub mod event;
pub mod metadata;
pub mod node;
pub mod path;
pub mod reference;
pub mod repo;
pub mod types;

pub use block::BlockNode;
pub use event::{NodeEvent, NodeEventKind};
pub use metadata::{MetadataEntry, RESERVED_METADATA_KEYS, metadata_value};
pub use node::{
    FAKE_MD5, FAKE_SHA256, Node, NodeState, METADATA_KEY_LINK_FULL_PATH, METADATA_KEY_LINK_PROJECT,
    METADATA_KEY_LINK_REPO,
};
pub use path::{NodePath, PathError, ROOT_PATH};
pub use reference::FileReference;
pub use repo::{DEFAULT_CREDENTIALS_KEY, RepoCategory, RepoInfo};
pub use types::{ProjectId, RepoName};
