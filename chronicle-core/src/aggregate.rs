//! Command-side domain primitives.
//!
//! This module defines the building blocks for aggregates: state
//! reconstruction (`Aggregate::on`) and command handling (`Handle`).

use crate::{command::Command, event::Event};

/// Current state of one domain entity, derived by folding its events.
///
/// The repository builds a fresh instance for every load and calls
/// [`Aggregate::on`] once per stored event in ascending version order.
/// Aggregates are never cached between calls.
// ANCHOR: aggregate_trait
pub trait Aggregate: Send + 'static {
    /// Error returned when an event or command cannot be handled.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fold one event into the current state.
    ///
    /// Must be a pure function of the current state and the event (no I/O).
    /// Returning an error stops the replay; the repository reports it as
    /// [`ErrorKind::UnhandledEvent`](crate::error::ErrorKind::UnhandledEvent).
    ///
    /// ```ignore
    /// fn on(&mut self, event: &dyn Event) -> Result<(), Self::Error> {
    ///     if let Some(e) = event.downcast_ref::<FundsDeposited>() {
    ///         self.balance += e.amount;
    ///     } else {
    ///         return Err(AccountError::UnknownEvent(event.event_type()));
    ///     }
    ///     self.version = event.event_version();
    ///     Ok(())
    /// }
    /// ```
    fn on(&mut self, event: &dyn Event) -> Result<(), Self::Error>;
}
// ANCHOR_END: aggregate_trait

/// Entry point for command handling.
///
/// Each command type gets its own implementation, letting the aggregate
/// express validation logic in a strongly typed way. Only aggregates that
/// implement `Handle<C>` can be driven through
/// [`Repository::apply`](crate::repository::Repository::apply) with a `C`.
///
/// ```ignore
/// impl Handle<Deposit> for Account {
///     fn handle(&self, command: &Deposit) -> Result<Vec<Box<dyn Event>>, Self::Error> {
///         if command.amount <= 0 {
///             return Err(AccountError::NonPositiveAmount);
///         }
///         Ok(vec![Box::new(FundsDeposited {
///             model: EventModel::new(&command.id, self.version + 1, Utc::now()),
///             amount: command.amount,
///         })])
///     }
/// }
/// ```
// ANCHOR: handle_trait
pub trait Handle<C: Command>: Aggregate {
    /// Handle a command and produce events.
    ///
    /// Produced events must carry the command's aggregate id and versions
    /// continuing from the aggregate's current version.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the command is invalid for the current
    /// aggregate state.
    fn handle(&self, command: &C) -> Result<Vec<Box<dyn Event>>, Self::Error>;
}
// ANCHOR_END: handle_trait
