use serde::{Deserialize, Serialize};

/// Reference count for one stored content blob.
///
/// Keyed by `(sha256, credentials_key)`; the same content held under
/// different storage credentials is counted independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub sha256: String,
    pub credentials_key: Option<String>,
    pub count: i64,
}

impl FileReference {
    #[must_use]
    pub fn new(sha256: impl Into<String>, credentials_key: Option<String>, count: i64) -> Self {
        Self {
            sha256: sha256.into(),
            credentials_key,
            count,
        }
    }
}
