use std::time::Duration;

use thiserror::Error;

use arbor_core::PathError;
use arbor_store::StoreError;

/// Render a byte count the way a human reads a quota limit.
#[must_use]
pub fn human_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Errors surfaced by engine operations.
///
/// Validation failures are raised before any mutation; conflict and
/// quota failures before the write they guard. `Timeout` is the one
/// post-write error: the operation committed, was compensated, and
/// then reported.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The addressed node, repository, or deletion point is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A live occupant or type mismatch blocks the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The repository's byte quota would be exceeded.
    #[error(
        "repository quota exceeded: used {}, quota {}",
        human_bytes(*used),
        human_bytes(*quota)
    )]
    QuotaExceeded { used: i64, quota: i64 },

    /// The operation overran its time budget after committing; its
    /// effects were rolled back before this was raised.
    #[error("operation exceeded its {budget:?} budget ({elapsed:?})")]
    Timeout { elapsed: Duration, budget: Duration },

    /// Caller input was rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The repository category does not support the operation.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// A store backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PathError> for EngineError {
    fn from(err: PathError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_error_is_human_readable() {
        let err = EngineError::QuotaExceeded {
            used: 3 * 1024 * 1024 * 1024,
            quota: 4 * 1024 * 1024 * 1024,
        };
        assert_eq!(
            err.to_string(),
            "repository quota exceeded: used 3.0 GB, quota 4.0 GB"
        );
    }

    #[test]
    fn small_sizes_stay_in_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KB");
    }

    #[test]
    fn path_errors_become_validation() {
        let err: EngineError = PathError::Empty.into();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
