//! Application service orchestration.
//!
//! `Repository` rebuilds aggregates by replaying their stored history,
//! dispatches commands to aggregate handlers, appends the resulting events to
//! the store and publishes them to observers.
//!
//! A repository holds no per-aggregate state. Every call builds a fresh
//! aggregate from the factory and folds the history into it.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;

use crate::{
    aggregate::{Aggregate, Handle},
    command::Command,
    error::{Error, ErrorKind, Result},
    event::Event,
    serializer::{JsonSerializer, Serializer},
    store::Store,
};

/// Callback notified of each event [`Repository::apply`] has persisted.
///
/// Observers run synchronously on the caller's task, in registration order.
/// A panicking observer unwinds through `apply`; the events stay persisted.
pub type Observer = Arc<dyn Fn(&dyn Event) + Send + Sync>;

type Factory<A> = Arc<dyn Fn() -> A + Send + Sync>;

/// Repository bound to one aggregate type, one store and one serializer.
///
/// ```ignore
/// let serializer = JsonSerializer::new();
/// serializer.bind::<OrderCreated>().bind::<OrderShipped>();
///
/// let repository: Repository<Order, _> =
///     Repository::new(inmemory::Store::new(), serializer)
///         .with_observer(|event| println!("{}", event.event_type()));
///
/// let version = repository.apply(&CreateOrder::new("order-1")).await?;
/// let order = repository.load("order-1").await?;
/// ```
pub struct Repository<A, S, Z = JsonSerializer> {
    store: S,
    serializer: Z,
    factory: Factory<A>,
    observers: Vec<Observer>,
}

impl<A, S, Z> Repository<A, S, Z>
where
    A: Aggregate + Default,
    S: Store,
    Z: Serializer,
{
    /// Create a repository whose aggregates start from `A::default()`.
    #[must_use]
    pub fn new(store: S, serializer: Z) -> Self {
        Self::from_factory(store, serializer, A::default)
    }
}

impl<A, S, Z> Repository<A, S, Z>
where
    A: Aggregate,
    S: Store,
    Z: Serializer,
{
    /// Create a repository for an aggregate without a `Default` impl.
    #[must_use]
    pub fn from_factory(
        store: S,
        serializer: Z,
        factory: impl Fn() -> A + Send + Sync + 'static,
    ) -> Self {
        Self {
            store,
            serializer,
            factory: Arc::new(factory),
            observers: Vec::new(),
        }
    }

    /// Replace the function that creates empty aggregates.
    #[must_use]
    pub fn with_factory(mut self, factory: impl Fn() -> A + Send + Sync + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Register an observer. Observers are called in the order they were
    /// added.
    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(&dyn Event) + Send + Sync + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn serializer(&self) -> &Z {
        &self.serializer
    }

    /// A fresh, empty aggregate.
    #[must_use]
    pub fn new_aggregate(&self) -> A {
        (self.factory)()
    }

    /// Marshal `events` and append them to the store in a single call.
    ///
    /// Saving no events is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if the events do not share one
    /// non-empty aggregate id. Serializer and store errors are returned
    /// unchanged.
    #[tracing::instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn save(&self, events: &[Box<dyn Event>]) -> Result<()> {
        let Some(first) = events.first() else {
            return Ok(());
        };

        let aggregate_id = first.aggregate_id();
        if aggregate_id.is_empty() {
            return Err(Error::invalid_argument(
                "events may not carry a blank aggregate id",
            ));
        }
        if let Some(stray) = events.iter().find(|e| e.aggregate_id() != aggregate_id) {
            return Err(Error::invalid_argument(format!(
                "event for aggregate {} cannot be saved with events for aggregate {aggregate_id}",
                stray.aggregate_id()
            )));
        }

        let history = self.serializer.marshal_all(events)?;
        let Some(records) = NonEmpty::from_vec(history) else {
            return Ok(());
        };
        self.store.save(aggregate_id, records).await
    }

    /// Load an aggregate by replaying its full history.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AggregateNotFound`] if no events are stored for
    /// `aggregate_id`, and [`ErrorKind::UnhandledEvent`] if the aggregate
    /// fails to fold an event. Store and serializer errors are returned
    /// unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, aggregate_id: &str) -> Result<A> {
        let (aggregate, _) = self.replay(aggregate_id, 0, None).await?;
        Ok(aggregate)
    }

    /// Load an aggregate as of `version`; `0` means the latest version.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    #[tracing::instrument(skip(self))]
    pub async fn load_version(&self, aggregate_id: &str, version: u64) -> Result<A> {
        let (aggregate, _) = self.replay(aggregate_id, version, None).await?;
        Ok(aggregate)
    }

    /// Load an aggregate as of `cutoff`.
    ///
    /// Folding stops at the first event that occurred after `cutoff`. Event
    /// timestamps are assumed not to decrease as versions increase; a history
    /// that breaks this is truncated at its first out-of-range event.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    #[tracing::instrument(skip(self))]
    pub async fn load_time(&self, aggregate_id: &str, cutoff: DateTime<Utc>) -> Result<A> {
        let (aggregate, _) = self.replay(aggregate_id, 0, Some(cutoff)).await?;
        Ok(aggregate)
    }

    /// Handle a command and return the aggregate's resulting version.
    ///
    /// An aggregate with no history starts fresh at version 0. Produced
    /// events are persisted, then handed to every observer: each event goes
    /// to all observers before the next event is published. If the handler
    /// produces no events the current version is returned and nothing is
    /// written.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidArgument`] if the command's aggregate id is
    ///   blank, or if the handler produces an event for another aggregate.
    /// - [`ErrorKind::UnhandledCommand`] wrapping the aggregate's error if
    ///   the handler rejects the command.
    /// - [`ErrorKind::Conflict`] if another writer persisted the same
    ///   versions first. Reload and retry.
    /// - Any error from replay other than a missing aggregate, and any
    ///   error from [`save`](Self::save).
    #[tracing::instrument(skip(self, command), fields(aggregate_id = command.aggregate_id()))]
    pub async fn apply<C>(&self, command: &C) -> Result<u64>
    where
        C: Command,
        A: Handle<C>,
    {
        let aggregate_id = command.aggregate_id();
        if aggregate_id.is_empty() {
            return Err(Error::invalid_argument(
                "command may not contain a blank aggregate id",
            ));
        }

        let (aggregate, version) = match self.replay(aggregate_id, 0, None).await {
            Ok(loaded) => loaded,
            Err(e) if e.kind() == ErrorKind::AggregateNotFound => {
                tracing::trace!("no history, starting from an empty aggregate");
                (self.new_aggregate(), 0)
            }
            Err(e) => return Err(e),
        };

        let events =
            Handle::<C>::handle(&aggregate, command).map_err(Error::unhandled_command)?;
        drop(aggregate);

        if let Some(stray) = events.iter().find(|e| e.aggregate_id() != aggregate_id) {
            return Err(Error::invalid_argument(format!(
                "command for aggregate {aggregate_id} produced an event for aggregate {}",
                stray.aggregate_id()
            )));
        }

        self.save(&events).await?;

        let version = events.last().map_or(version, |event| event.event_version());

        for event in &events {
            for observer in &self.observers {
                observer(event.as_ref());
            }
        }

        tracing::debug!(version, event_count = events.len(), "command applied");
        Ok(version)
    }

    /// Fold the history up to `to_version` (0 = latest) into a fresh
    /// aggregate, stopping early at the first event after `cutoff`.
    ///
    /// Returns the aggregate and the version of the last folded event.
    async fn replay(
        &self,
        aggregate_id: &str,
        to_version: u64,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<(A, u64)> {
        let history = self.store.load(aggregate_id, 0, to_version).await?;
        if history.is_empty() {
            return Err(Error::not_found(aggregate_id));
        }
        tracing::debug!("loaded {} event(s)", history.len());

        let mut aggregate = self.new_aggregate();
        let mut version = 0;
        for record in &history {
            let event = self.serializer.unmarshal_event(record)?;
            if cutoff.is_some_and(|cutoff| event.event_at() > cutoff) {
                tracing::trace!(
                    version = event.event_version(),
                    "event occurred after cutoff, stopping replay"
                );
                break;
            }

            aggregate
                .on(event.as_ref())
                .map_err(|e| Error::unhandled_event(event.event_type(), e))?;
            version = event.event_version();
        }

        Ok((aggregate, version))
    }
}

impl<A, S, Z> Clone for Repository<A, S, Z>
where
    S: Clone,
    Z: Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            serializer: self.serializer.clone(),
            factory: Arc::clone(&self.factory),
            observers: self.observers.clone(),
        }
    }
}

impl<A, S, Z> fmt::Debug for Repository<A, S, Z>
where
    S: fmt::Debug,
    Z: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("store", &self.store)
            .field("serializer", &self.serializer)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
