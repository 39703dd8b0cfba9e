use async_trait::async_trait;
use dashmap::DashMap;

use arbor_store::{DecrementOutcome, ReferenceStore, StoreError};

type RefKey = (String, Option<String>);

/// In-memory [`ReferenceStore`]. Entry-level mutation keeps each
/// counter update atomic, so the duplicate-key retry path of real
/// backends never triggers here.
#[derive(Debug, Default)]
pub struct MemoryReferenceStore {
    counts: DashMap<RefKey, i64>,
}

impl MemoryReferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(sha256: &str, credentials_key: Option<&str>) -> RefKey {
    (sha256.to_owned(), credentials_key.map(str::to_owned))
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn try_increment(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<i64, StoreError> {
        let mut entry = self.counts.entry(key(sha256, credentials_key)).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn decrement(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<DecrementOutcome, StoreError> {
        let mut entry = self.counts.entry(key(sha256, credentials_key)).or_insert(0);
        let raw = *entry - 1;
        *entry = raw.max(0);
        Ok(DecrementOutcome {
            count: *entry,
            underflow: raw < 0,
        })
    }

    async fn get_count(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<i64, StoreError> {
        Ok(self
            .counts
            .get(&key(sha256, credentials_key))
            .map_or(0, |entry| *entry))
    }
}
