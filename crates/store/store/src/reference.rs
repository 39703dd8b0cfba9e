use async_trait::async_trait;

use crate::error::StoreError;

/// Result of a reference decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecrementOutcome {
    /// The stored count after the decrement (never negative).
    pub count: i64,
    /// The decrement would have gone below zero and was clamped.
    /// Signals drift between node records and reference counts.
    pub underflow: bool,
}

/// Content reference-count collection, keyed by
/// `(sha256, credentials_key)`.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Increment a count, creating it at one when absent. A concurrent
    /// create of the same key may surface
    /// [`StoreError::DuplicateKey`]; callers retry once.
    async fn try_increment(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<i64, StoreError>;

    /// Decrement a count, clamping at zero.
    async fn decrement(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<DecrementOutcome, StoreError>;

    /// Current count; zero when the key was never incremented.
    async fn get_count(
        &self,
        sha256: &str,
        credentials_key: Option<&str>,
    ) -> Result<i64, StoreError>;
}
