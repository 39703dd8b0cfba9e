use serde::{Deserialize, Serialize};

/// One key/value metadata entry attached to a node.
///
/// Entries flagged `system` are reserved for the engine (link targets,
/// upload bookkeeping) and cannot be set through caller input unless the
/// engine is configured to allow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub system: bool,
}

impl MetadataEntry {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            system: false,
        }
    }

    #[must_use]
    pub fn system(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            system: true,
        }
    }
}

/// Metadata keys only the engine may write.
pub const RESERVED_METADATA_KEYS: &[&str] = &[
    crate::node::METADATA_KEY_LINK_PROJECT,
    crate::node::METADATA_KEY_LINK_REPO,
    crate::node::METADATA_KEY_LINK_FULL_PATH,
    "upload_id",
];

/// Look up a metadata value by key.
#[must_use]
pub fn metadata_value<'a>(
    metadata: &'a [MetadataEntry],
    key: &str,
) -> Option<&'a serde_json::Value> {
    metadata
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| &entry.value)
}

/// Drop caller-supplied entries that claim reserved keys or the system
/// flag, unless explicitly allowed.
#[must_use]
pub fn sanitize_caller_metadata(
    metadata: Vec<MetadataEntry>,
    allow_system: bool,
) -> Vec<MetadataEntry> {
    if allow_system {
        return metadata;
    }
    metadata
        .into_iter()
        .filter(|entry| !entry.system && !RESERVED_METADATA_KEYS.contains(&entry.key.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_reserved_and_system_entries() {
        let metadata = vec![
            MetadataEntry::new("team", "ci"),
            MetadataEntry::system("internal", 1),
            MetadataEntry::new(crate::node::METADATA_KEY_LINK_PROJECT, "other"),
        ];
        let kept = sanitize_caller_metadata(metadata, false);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key, "team");
    }

    #[test]
    fn sanitize_keeps_everything_when_allowed() {
        let metadata = vec![MetadataEntry::system("internal", 1)];
        assert_eq!(sanitize_caller_metadata(metadata, true).len(), 1);
    }

    #[test]
    fn lookup_by_key() {
        let metadata = vec![MetadataEntry::new("team", "ci")];
        assert_eq!(
            metadata_value(&metadata, "team"),
            Some(&serde_json::json!("ci"))
        );
        assert!(metadata_value(&metadata, "missing").is_none());
    }
}
