//! Version-monotonicity violations.
//!
//! Every store must reject a record whose version is not strictly greater
//! than the latest version already on file for its aggregate. That rejection
//! is how two writers racing on the same aggregate are kept from both
//! committing the same version: the loser gets an
//! [`ErrorKind::Conflict`](crate::error::ErrorKind::Conflict) error whose
//! cause is a [`VersionConflict`]. Retrying is left to the caller.

use thiserror::Error;

/// A write attempted a version at or below the current stored version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", format_conflict(.aggregate_id, .attempted, .current))]
pub struct VersionConflict {
    pub aggregate_id: String,
    /// The version the rejected record carried.
    pub attempted: u64,
    /// The latest version on file when the write was attempted.
    pub current: u64,
}

/// Build a human-readable message for a [`VersionConflict`], including an
/// actionable hint for the caller.
fn format_conflict(aggregate_id: &str, attempted: &u64, current: &u64) -> String {
    if attempted == current {
        format!(
            "aggregate {aggregate_id} already has version {current} (hint: another writer \
             committed first; reload and retry)"
        )
    } else {
        format!(
            "aggregate {aggregate_id} is at version {current}, cannot write version {attempted} \
             (hint: stream was modified; reload and retry)"
        )
    }
}
