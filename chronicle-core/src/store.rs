//! Persistence layer abstractions.
//!
//! This module describes the storage contract ([`Store`]), the persisted form
//! of an event ([`Record`]) and a reference in-memory implementation. A store
//! knows nothing about event semantics: it orders and filters opaque records
//! by version.
use std::future::Future;

pub use nonempty::NonEmpty;

use crate::error::Result;

pub mod inmemory;

/// Serialized form of one event.
///
/// `version` mirrors the event's version so the store can order and filter
/// without decoding `data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub version: u64,
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(version: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            version,
            data: data.into(),
        }
    }
}

/// Records for one aggregate, ascending by version with no duplicates.
pub type History = Vec<Record>;

/// Whether `version` falls inside the inclusive range `from..=to`, where a
/// `to` of zero leaves the upper end open.
#[must_use]
pub const fn in_range(version: u64, from_version: u64, to_version: u64) -> bool {
    version >= from_version && (to_version == 0 || version <= to_version)
}

/// Abstraction over the persistence layer for aggregate histories.
///
/// Implementations must serialize `save` and `load` for the same aggregate
/// relative to each other; checking the latest version and appending has to
/// happen in one critical section.
// ANCHOR: store_trait
pub trait Store: Send + Sync {
    /// Append records to an aggregate's history.
    ///
    /// The batch is all-or-nothing. Records may arrive in any order; the
    /// stored history stays sorted by version.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    ///   if a record has version 0 or two records in the batch share a
    ///   version.
    /// - [`ErrorKind::Conflict`](crate::error::ErrorKind::Conflict) if any
    ///   record's version is not strictly greater than the latest stored
    ///   version for the aggregate.
    fn save<'a>(
        &'a self,
        aggregate_id: &'a str,
        records: NonEmpty<Record>,
    ) -> impl Future<Output = Result<()>> + Send + 'a;

    /// Load the records with `from_version <= version` and, unless
    /// `to_version` is zero, `version <= to_version`.
    ///
    /// Pass `0, 0` for the full history.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AggregateNotFound`](crate::error::ErrorKind::AggregateNotFound)
    /// if the aggregate has no history at all. An aggregate that exists but
    /// has no records in range yields an empty history.
    fn load<'a>(
        &'a self,
        aggregate_id: &'a str,
        from_version: u64,
        to_version: u64,
    ) -> impl Future<Output = Result<History>> + Send + 'a;
}
// ANCHOR_END: store_trait
