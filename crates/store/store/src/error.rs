use thiserror::Error;

/// Errors surfaced by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique-index violation: inserting over a live path, or a bulk
    /// restore colliding with a live occupant. Callers use this variant
    /// to detect races and fall back to slower per-record paths.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The backend failed in a way the caller cannot act on.
    #[error("backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
