//! Core traits and types for the Chronicle event-sourcing library.
//!
//! This crate provides the foundational abstractions for event sourcing:
//!
//! - [`event`] - Events and their type tags (`Event`, `DomainEvent`, `EventModel`)
//! - [`command`] - Commands addressed to one aggregate (`Command`, `CommandModel`)
//! - [`aggregate`] - State folding and command handling (`Aggregate`, `Handle`)
//! - [`serializer`] - Event encoding (`Serializer`, `JsonSerializer`)
//! - [`store`] - Record persistence abstraction (`Store`) and an in-memory store
//! - [`repository`] - Replay, command dispatch and publication (`Repository`)
//! - [`concurrency`] - Version conflict reporting (`VersionConflict`)
//! - [`error`] - Coded, chained errors (`Error`, `ErrorKind`)
//!
//! # Example
//!
//! ```
//! use chronicle_core::{repository::Repository, serializer::JsonSerializer, store::inmemory};
//!
//! # #[derive(Default)]
//! # struct Order;
//! # impl chronicle_core::aggregate::Aggregate for Order {
//! #     type Error = std::convert::Infallible;
//! #     fn on(&mut self, _: &dyn chronicle_core::event::Event) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! let repo: Repository<Order, _> = Repository::new(inmemory::Store::new(), JsonSerializer::new());
//! assert_eq!(repo.store().current_version("order-1"), None);
//! ```
//!
//! Most users should depend on the `chronicle` crate, which re-exports these
//! types together with the derive macros.

pub mod aggregate;
pub mod command;
pub mod concurrency;
pub mod error;
pub mod event;
pub mod repository;
pub mod serializer;
pub mod store;

// Test utilities module: public when feature enabled, internal for crate tests
#[cfg(feature = "test-util")]
pub mod test;

#[cfg(all(test, not(feature = "test-util")))]
pub(crate) mod test;
