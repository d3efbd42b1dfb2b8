#![doc = include_str!("../README.md")]

#[cfg(feature = "test-util")]
pub use chronicle_core::test;
pub use chronicle_core::{
    aggregate,
    aggregate::{Aggregate, Handle},
    command,
    command::{Command, CommandModel},
    concurrency,
    concurrency::VersionConflict,
    error,
    error::{Error, ErrorKind, Result},
    event,
    event::{DomainEvent, Event, EventKind, EventModel},
    repository,
    repository::Repository,
    serializer,
    serializer::{JsonSerializer, Serializer},
};
// Re-export proc macro derives so consumers only depend on `chronicle`.
pub use chronicle_macros::{Command, Event};

pub mod store {
    pub use chronicle_core::store::{History, NonEmpty, Record, Store, in_range};

    pub use chronicle_core::store::inmemory;
}
