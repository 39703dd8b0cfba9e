use std::sync::Arc;

use tracing::{instrument, warn};

use arbor_core::FileReference;
use arbor_store::{ReferenceStore, StoreError};

use crate::error::EngineError;

/// Content reference counting, keyed by `(sha256, credentials_key)`.
///
/// A count reaching zero marks the blob eligible for cleanup; the
/// cleanup itself belongs to the blob layer.
#[derive(Clone)]
pub struct FileReferenceService {
    store: Arc<dyn ReferenceStore>,
}

impl FileReferenceService {
    #[must_use]
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }

    /// Increment a count. Two writers creating the same key can race
    /// on backends with a unique index; the loser retries exactly
    /// once, which lands on the now-existing row.
    #[instrument(name = "reference.increment", skip_all, fields(sha256))]
    pub async fn increment(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<i64, EngineError> {
        match self.store.try_increment(sha256, credentials_key).await {
            Ok(count) => Ok(count),
            Err(StoreError::DuplicateKey(_)) => {
                warn!(sha256, "reference insert raced, retrying increment");
                Ok(self.store.try_increment(sha256, credentials_key).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Decrement a count. Underflow is logged and clamped; the stores
    /// drifted, which a reconciliation job sorts out, not this call.
    pub async fn decrement(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<i64, EngineError> {
        let outcome = self.store.decrement(sha256, credentials_key).await?;
        if outcome.underflow {
            warn!(sha256, "reference count underflow, clamped to zero");
        }
        Ok(outcome.count)
    }

    pub async fn count(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<i64, EngineError> {
        Ok(self.store.get_count(sha256, credentials_key).await?)
    }

    /// The full reference record, for cleanup jobs that page over
    /// candidate blobs.
    pub async fn detail(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<FileReference, EngineError> {
        let count = self.store.get_count(sha256, credentials_key).await?;
        Ok(FileReference::new(
            sha256,
            credentials_key.map(str::to_owned),
            count,
        ))
    }
}
