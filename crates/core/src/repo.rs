use serde::{Deserialize, Serialize};

use crate::types::{ProjectId, RepoName};

/// Storage credentials key used when a repository has none of its own.
pub const DEFAULT_CREDENTIALS_KEY: &str = "default";

/// Repository category. Only local and composite repositories hold
/// nodes that can be moved or copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepoCategory {
    Local,
    Remote,
    Virtual,
    Composite,
}

impl RepoCategory {
    #[must_use]
    pub fn supports_relocation(self) -> bool {
        matches!(self, Self::Local | Self::Composite)
    }
}

/// Resolved repository descriptor, as returned by the repository
/// resolver collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub project_id: ProjectId,
    pub name: RepoName,
    pub category: RepoCategory,
    /// Storage credentials; `None` means [`DEFAULT_CREDENTIALS_KEY`].
    pub credentials_key: Option<String>,
}

impl RepoInfo {
    /// Effective credentials key, with the default applied.
    #[must_use]
    pub fn effective_credentials_key(&self) -> &str {
        self.credentials_key
            .as_deref()
            .unwrap_or(DEFAULT_CREDENTIALS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocation_support_by_category() {
        assert!(RepoCategory::Local.supports_relocation());
        assert!(RepoCategory::Composite.supports_relocation());
        assert!(!RepoCategory::Remote.supports_relocation());
        assert!(!RepoCategory::Virtual.supports_relocation());
    }

    #[test]
    fn default_credentials_key_applies() {
        let repo = RepoInfo {
            project_id: ProjectId::new("p"),
            name: RepoName::new("r"),
            category: RepoCategory::Local,
            credentials_key: None,
        };
        assert_eq!(repo.effective_credentials_key(), DEFAULT_CREDENTIALS_KEY);
    }
}
