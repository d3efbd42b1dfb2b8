//! In-memory store implementation for testing.
//!
//! This module provides [`Store`], a thread-safe in-memory implementation of
//! [`Store`](super::Store) suitable for unit tests and examples.
//!
//! # Example
//!
//! ```
//! use chronicle_core::store::inmemory;
//!
//! let store = inmemory::Store::new();
//! assert_eq!(store.current_version("order-1"), None);
//! ```

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, RwLock},
};

use nonempty::NonEmpty;

use crate::{
    concurrency::VersionConflict,
    error::{Error, Result},
    store::{History, Record, in_range},
};

/// In-memory store that keeps one history per aggregate id.
///
/// Every read and write goes through a single lock shared by all aggregates,
/// so the "check latest version, then append" step in
/// [`save`](super::Store::save) cannot interleave with another writer.
/// Clones share the same underlying data.
#[derive(Clone, Debug, Default)]
pub struct Store {
    inner: Arc<RwLock<HashMap<String, History>>>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest stored version for an aggregate, or `None` if it has no
    /// history.
    ///
    /// # Panics
    ///
    /// Panics if the lock was poisoned by a panicking writer.
    #[must_use]
    pub fn current_version(&self, aggregate_id: &str) -> Option<u64> {
        let inner = self.inner.read().expect("in-memory store lock poisoned");
        inner
            .get(aggregate_id)
            .and_then(|history| history.last())
            .map(|record| record.version)
    }

    fn append(&self, aggregate_id: &str, records: NonEmpty<Record>) -> Result<()> {
        let mut batch: Vec<Record> = records.into();
        batch.sort_by_key(|record| record.version);

        let lowest = batch[0].version;
        if lowest == 0 {
            return Err(Error::invalid_argument(format!(
                "record for aggregate {aggregate_id} has version 0; versions start at 1"
            )));
        }
        if let Some(pair) = batch.windows(2).find(|pair| pair[0].version == pair[1].version) {
            return Err(Error::invalid_argument(format!(
                "batch for aggregate {aggregate_id} contains version {} more than once",
                pair[0].version
            )));
        }

        let mut inner = self.inner.write().expect("in-memory store lock poisoned");
        let current = inner
            .get(aggregate_id)
            .and_then(|history| history.last())
            .map_or(0, |record| record.version);

        if lowest <= current {
            tracing::debug!(lowest, current, "stale version, rejecting save");
            return Err(Error::conflict(VersionConflict {
                aggregate_id: aggregate_id.to_string(),
                attempted: lowest,
                current,
            }));
        }

        // Every record is above `current`, so appending the sorted batch keeps
        // the history sorted.
        let appended = batch.len();
        inner
            .entry(aggregate_id.to_string())
            .or_default()
            .extend(batch);
        drop(inner);
        tracing::debug!(records_appended = appended, "records saved");
        Ok(())
    }

    fn history(&self, aggregate_id: &str, from_version: u64, to_version: u64) -> Result<History> {
        let inner = self.inner.read().expect("in-memory store lock poisoned");
        let Some(all) = inner.get(aggregate_id) else {
            tracing::trace!("no history on file");
            return Err(Error::not_found(aggregate_id));
        };

        let history: History = all
            .iter()
            .filter(|record| in_range(record.version, from_version, to_version))
            .cloned()
            .collect();
        drop(inner);

        tracing::debug!(records_loaded = history.len(), "loaded records from store");
        Ok(history)
    }
}

impl super::Store for Store {
    #[tracing::instrument(skip(self, records), fields(record_count = records.len()))]
    fn save<'a>(
        &'a self,
        aggregate_id: &'a str,
        records: NonEmpty<Record>,
    ) -> impl Future<Output = Result<()>> + Send + 'a {
        std::future::ready(self.append(aggregate_id, records))
    }

    #[tracing::instrument(skip(self))]
    fn load<'a>(
        &'a self,
        aggregate_id: &'a str,
        from_version: u64,
        to_version: u64,
    ) -> impl Future<Output = Result<History>> + Send + 'a {
        std::future::ready(self.history(aggregate_id, from_version, to_version))
    }
}
