//! Test utilities for event-sourced aggregates.
//!
//! - [`TestFramework`]: given/when/then unit testing for command handlers,
//!   with no store or serializer involved.
//! - [`RepositoryTestExt`]: seeding and injection helpers for integration
//!   tests against a real [`Repository`].
//!
//! ```ignore
//! use chronicle::test::TestFramework;
//!
//! #[test]
//! fn shipping_a_created_order() {
//!     TestFramework::<Order>::given(vec![Box::new(order_created("o-1", 1))])
//!         .when(&ShipOrder::new("o-1"))
//!         .then_expect_event_types(&["OrderShipped"]);
//! }
//!
//! #[test]
//! fn shipping_twice_is_rejected() {
//!     TestFramework::<Order>::given(vec![
//!         Box::new(order_created("o-1", 1)),
//!         Box::new(order_shipped("o-1", 2)),
//!     ])
//!     .when(&ShipOrder::new("o-1"))
//!     .then_expect_error_message("already shipped");
//! }
//! ```

use std::{fmt, future::Future};

use nonempty::NonEmpty;

use crate::{
    aggregate::{Aggregate, Handle},
    command::Command,
    error::Result,
    event::{Event, short_type_name},
    repository::Repository,
    serializer::Serializer,
    store::{Record, Store},
};

// =============================================================================
// Repository Test Extension Trait
// =============================================================================

/// Test helpers for [`Repository`] that bypass command handlers.
///
/// Use them to set up history before exercising commands, or to simulate a
/// second writer racing the code under test.
///
/// ```ignore
/// use chronicle::test::RepositoryTestExt;
///
/// repo.seed_events(vec![Box::new(order_created("o-1", 1))]).await?;
///
/// // Another process ships the order behind our back.
/// repo.inject_concurrent_event(Box::new(order_shipped("o-1", 2))).await?;
/// ```
pub trait RepositoryTestExt {
    /// Persist events as-is, without consulting the aggregate.
    ///
    /// Events go through the repository's serializer, so they load back
    /// exactly as command-produced events would.
    ///
    /// # Errors
    ///
    /// Same as [`Repository::save`].
    fn seed_events<'a>(
        &'a self,
        events: Vec<Box<dyn Event>>,
    ) -> impl Future<Output = Result<()>> + Send + 'a;

    /// Persist a single event as if a concurrent writer had appended it.
    ///
    /// # Errors
    ///
    /// Same as [`Repository::save`].
    fn inject_concurrent_event<'a>(
        &'a self,
        event: Box<dyn Event>,
    ) -> impl Future<Output = Result<()>> + Send + 'a {
        self.seed_events(vec![event])
    }

    /// Append a raw record straight to the store, skipping the serializer.
    ///
    /// Use this to plant payloads the serializer would never produce.
    ///
    /// # Errors
    ///
    /// Same as [`Store::save`].
    fn inject_record<'a>(
        &'a self,
        aggregate_id: &'a str,
        record: Record,
    ) -> impl Future<Output = Result<()>> + Send + 'a;
}

impl<A, S, Z> RepositoryTestExt for Repository<A, S, Z>
where
    A: Aggregate,
    S: Store,
    Z: Serializer,
{
    fn seed_events<'a>(
        &'a self,
        events: Vec<Box<dyn Event>>,
    ) -> impl Future<Output = Result<()>> + Send + 'a {
        async move { self.save(&events).await }
    }

    fn inject_record<'a>(
        &'a self,
        aggregate_id: &'a str,
        record: Record,
    ) -> impl Future<Output = Result<()>> + Send + 'a {
        self.store().save(aggregate_id, NonEmpty::singleton(record))
    }
}

// =============================================================================
// Test Framework for Aggregate Unit Testing
// =============================================================================

/// Given/when/then harness for command handlers.
///
/// Events passed to [`given`](Self::given) and [`and`](Self::and) are folded
/// into a fresh aggregate; the command under test then runs against it.
pub struct TestFramework<A: Aggregate> {
    aggregate: A,
}

impl<A: Aggregate + Default> TestFramework<A> {
    /// Start a scenario from `A::default()` with `events` already folded in.
    ///
    /// Pass an empty `Vec` to start from a fresh aggregate.
    ///
    /// # Panics
    ///
    /// Panics if the aggregate fails to fold one of the events.
    #[must_use]
    #[track_caller]
    pub fn given(events: Vec<Box<dyn Event>>) -> Self {
        Self::given_state(A::default()).and(events)
    }
}

impl<A: Aggregate> TestFramework<A> {
    /// Start a scenario from an explicit aggregate value.
    #[must_use]
    pub const fn given_state(aggregate: A) -> Self {
        Self { aggregate }
    }

    /// Fold more events before the command runs.
    ///
    /// # Panics
    ///
    /// Panics if the aggregate fails to fold one of the events.
    #[must_use]
    #[track_caller]
    pub fn and(mut self, events: Vec<Box<dyn Event>>) -> Self {
        for event in events {
            if let Err(error) = self.aggregate.on(event.as_ref()) {
                panic!("Given event {event:?} could not be applied: {error}");
            }
        }
        self
    }

    /// Run a command against the prepared aggregate.
    #[must_use]
    pub fn when<C>(self, command: &C) -> TestResult<A>
    where
        C: Command,
        A: Handle<C>,
    {
        let result = Handle::<C>::handle(&self.aggregate, command);
        TestResult { result }
    }
}

/// Outcome of a command, ready for assertions.
pub struct TestResult<A: Aggregate> {
    result: Result<Vec<Box<dyn Event>>, A::Error>,
}

impl<A: Aggregate> TestResult<A> {
    /// Assert that the command produced exactly `expected`, all of type `E`.
    ///
    /// # Panics
    ///
    /// Panics if the command failed, produced an event of another type, or
    /// produced events that differ from `expected`.
    #[track_caller]
    pub fn then_expect_events<E>(self, expected: &[E])
    where
        E: Event + PartialEq,
    {
        let events = self.expect_events();
        let actual: Vec<&E> = events
            .iter()
            .map(|event| {
                event.downcast_ref::<E>().unwrap_or_else(|| {
                    panic!(
                        "Expected only {} events but got: {event:?}",
                        short_type_name::<E>()
                    )
                })
            })
            .collect();
        let expected: Vec<&E> = expected.iter().collect();
        assert_eq!(
            actual, expected,
            "Expected events did not match actual events"
        );
    }

    /// Assert the type tags of the produced events, in order.
    ///
    /// # Panics
    ///
    /// Panics if the command failed or the tags differ.
    #[track_caller]
    pub fn then_expect_event_types(self, expected: &[&str]) {
        let events = self.expect_events();
        let actual: Vec<&str> = events.iter().map(|event| event.event_type()).collect();
        assert_eq!(
            actual, expected,
            "Expected event types did not match actual event types"
        );
    }

    /// Assert that the command produced no events.
    ///
    /// # Panics
    ///
    /// Panics if the command failed or produced any events.
    #[track_caller]
    pub fn then_expect_no_events(self) {
        let events = self.expect_events();
        assert!(events.is_empty(), "Expected no events but got: {events:?}");
    }

    /// Assert that the command failed.
    ///
    /// # Panics
    ///
    /// Panics if the command succeeded.
    #[track_caller]
    pub fn then_expect_error(self) {
        if let Ok(events) = self.result {
            panic!("Expected error but got events: {events:?}");
        }
    }

    /// Assert that the command failed with `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the command succeeded or failed with a different error.
    #[track_caller]
    pub fn then_expect_error_eq(self, expected: &A::Error)
    where
        A::Error: PartialEq,
    {
        match self.result {
            Ok(events) => {
                panic!("Expected error but got events: {events:?}");
            }
            Err(error) => {
                assert_eq!(
                    error, *expected,
                    "Expected error did not match actual error"
                );
            }
        }
    }

    /// Assert that the command failed with a message containing
    /// `expected_substring`.
    ///
    /// # Panics
    ///
    /// Panics if the command succeeded or the message does not match.
    #[track_caller]
    pub fn then_expect_error_message(self, expected_substring: &str) {
        match self.result {
            Ok(events) => {
                panic!("Expected error but got events: {events:?}");
            }
            Err(error) => {
                let error_msg = error.to_string();
                assert!(
                    error_msg.contains(expected_substring),
                    "Expected error message to contain '{expected_substring}' but got: {error_msg}"
                );
            }
        }
    }

    /// The raw result, for assertions the helpers above don't cover.
    ///
    /// # Errors
    ///
    /// Returns the aggregate's error if the command was rejected.
    pub fn inspect_result(self) -> Result<Vec<Box<dyn Event>>, A::Error> {
        self.result
    }

    #[track_caller]
    fn expect_events(self) -> Vec<Box<dyn Event>> {
        match self.result {
            Ok(events) => events,
            Err(error) => panic!("Expected events but got error: {error}"),
        }
    }
}

impl<A> fmt::Debug for TestResult<A>
where
    A: Aggregate,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(events) => f.debug_tuple("Ok").field(events).finish(),
            Err(error) => f.debug_tuple("Err").field(error).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use thiserror::Error;

    use super::*;
    use crate::{
        command::CommandModel,
        event::{DomainEvent, EventModel},
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct ValueAdded {
        model: EventModel,
        amount: i32,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct ValueSubtracted {
        model: EventModel,
        amount: i32,
    }

    macro_rules! impl_event {
        ($($ty:ty),*) => {$(
            impl DomainEvent for $ty {}

            impl Event for $ty {
                fn aggregate_id(&self) -> &str {
                    &self.model.id
                }

                fn event_version(&self) -> u64 {
                    self.model.version
                }

                fn event_at(&self) -> DateTime<Utc> {
                    self.model.at
                }
            }
        )*};
    }

    impl_event!(ValueAdded, ValueSubtracted);

    fn model(version: u64) -> EventModel {
        EventModel::new("c1", version, Utc.timestamp_opt(0, 0).unwrap())
    }

    fn added(version: u64, amount: i32) -> ValueAdded {
        ValueAdded {
            model: model(version),
            amount,
        }
    }

    fn subtracted(version: u64, amount: i32) -> ValueSubtracted {
        ValueSubtracted {
            model: model(version),
            amount,
        }
    }

    #[derive(Debug, PartialEq, Eq, Error)]
    enum CounterError {
        #[error("amount must be positive")]
        NonPositive,
        #[error("insufficient value")]
        Insufficient,
        #[error("unexpected event {0}")]
        Unexpected(&'static str),
    }

    #[derive(Debug, Default)]
    struct Counter {
        value: i32,
        version: u64,
    }

    impl Aggregate for Counter {
        type Error = CounterError;

        fn on(&mut self, event: &dyn Event) -> Result<(), Self::Error> {
            if let Some(e) = event.downcast_ref::<ValueAdded>() {
                self.value += e.amount;
            } else if let Some(e) = event.downcast_ref::<ValueSubtracted>() {
                self.value -= e.amount;
            } else {
                return Err(CounterError::Unexpected(event.event_type()));
            }
            self.version = event.event_version();
            Ok(())
        }
    }

    #[derive(Debug)]
    struct AddValue(i32);

    #[derive(Debug)]
    struct SubtractValue(i32);

    impl Command for AddValue {
        fn aggregate_id(&self) -> &str {
            "c1"
        }
    }

    impl Command for SubtractValue {
        fn aggregate_id(&self) -> &str {
            "c1"
        }
    }

    impl Handle<AddValue> for Counter {
        fn handle(&self, command: &AddValue) -> Result<Vec<Box<dyn Event>>, Self::Error> {
            if command.0 <= 0 {
                return Err(CounterError::NonPositive);
            }
            Ok(vec![Box::new(added(self.version + 1, command.0))])
        }
    }

    impl Handle<SubtractValue> for Counter {
        fn handle(&self, command: &SubtractValue) -> Result<Vec<Box<dyn Event>>, Self::Error> {
            if command.0 <= 0 {
                return Err(CounterError::NonPositive);
            }
            if self.value < command.0 {
                return Err(CounterError::Insufficient);
            }
            Ok(vec![Box::new(subtracted(self.version + 1, command.0))])
        }
    }

    impl Handle<CommandModel> for Counter {
        fn handle(&self, _: &CommandModel) -> Result<Vec<Box<dyn Event>>, Self::Error> {
            Ok(vec![])
        }
    }

    type CounterTest = TestFramework<Counter>;

    #[test]
    fn given_no_events_when_add_then_produces_event() {
        CounterTest::given(vec![])
            .when(&AddValue(10))
            .then_expect_events(&[added(1, 10)]);
    }

    #[test]
    fn given_events_when_subtract_then_produces_event() {
        CounterTest::given(vec![Box::new(added(1, 20))])
            .when(&SubtractValue(5))
            .then_expect_events(&[subtracted(2, 5)]);
    }

    #[test]
    fn given_insufficient_balance_when_subtract_then_error() {
        CounterTest::given(vec![Box::new(added(1, 10))])
            .when(&SubtractValue(20))
            .then_expect_error();
    }

    #[test]
    fn given_insufficient_balance_when_subtract_then_error_message() {
        CounterTest::given(vec![Box::new(added(1, 10))])
            .when(&SubtractValue(20))
            .then_expect_error_message("insufficient value");
    }

    #[test]
    fn given_events_and_more_events_when_command() {
        CounterTest::given(vec![Box::new(added(1, 10))])
            .and(vec![Box::new(added(2, 5))])
            .when(&SubtractValue(12))
            .then_expect_events(&[subtracted(3, 12)]);
    }

    #[test]
    fn event_types_are_checked_in_order() {
        CounterTest::given(vec![])
            .when(&AddValue(1))
            .then_expect_event_types(&["ValueAdded"]);
    }

    #[test]
    fn given_state_skips_folding() {
        TestFramework::given_state(Counter {
            value: 50,
            version: 7,
        })
        .when(&SubtractValue(50))
        .then_expect_events(&[subtracted(8, 50)]);
    }

    #[test]
    fn no_op_command_produces_no_events() {
        CounterTest::given(vec![])
            .when(&CommandModel::new("c1"))
            .then_expect_no_events();
    }

    #[test]
    fn then_expect_error_eq_matches_error_value() {
        CounterTest::given(vec![])
            .when(&AddValue(-5))
            .then_expect_error_eq(&CounterError::NonPositive);
    }

    #[test]
    fn inspect_result_returns_raw_result() {
        let events = CounterTest::given(vec![])
            .when(&AddValue(10))
            .inspect_result()
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_version(), 1);
    }

    #[test]
    #[should_panic(expected = "Expected events did not match actual events")]
    fn mismatched_events_panic() {
        CounterTest::given(vec![])
            .when(&AddValue(10))
            .then_expect_events(&[added(1, 11)]);
    }

    #[test]
    #[should_panic(expected = "Expected only ValueSubtracted events")]
    fn events_of_another_type_panic() {
        CounterTest::given(vec![])
            .when(&AddValue(10))
            .then_expect_events(&[subtracted(1, 10)]);
    }
}

#[cfg(test)]
mod repository_test_ext_tests {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::{
        error::ErrorKind,
        event::{DomainEvent, EventModel},
        serializer::JsonSerializer,
        store::inmemory,
    };

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct PointsAdded {
        #[serde(flatten)]
        model: EventModel,
        points: i32,
    }

    impl DomainEvent for PointsAdded {
        fn type_tag() -> &'static str {
            "points-added"
        }
    }

    impl Event for PointsAdded {
        fn aggregate_id(&self) -> &str {
            &self.model.id
        }

        fn event_version(&self) -> u64 {
            self.model.version
        }

        fn event_at(&self) -> DateTime<Utc> {
            self.model.at
        }
    }

    #[derive(Debug, Default)]
    struct Score {
        total: i32,
    }

    impl Aggregate for Score {
        type Error = std::convert::Infallible;

        fn on(&mut self, event: &dyn Event) -> Result<(), Self::Error> {
            if let Some(e) = event.downcast_ref::<PointsAdded>() {
                self.total += e.points;
            }
            Ok(())
        }
    }

    fn points(version: u64, points: i32) -> Box<dyn Event> {
        Box::new(PointsAdded {
            model: EventModel::new("s1", version, Utc.timestamp_opt(0, 0).unwrap()),
            points,
        })
    }

    fn repository() -> Repository<Score, inmemory::Store> {
        let serializer = JsonSerializer::new();
        serializer.bind::<PointsAdded>();
        Repository::new(inmemory::Store::new(), serializer)
    }

    #[tokio::test]
    async fn seed_events_appends_events() {
        let repo = repository();
        repo.seed_events(vec![points(1, 10), points(2, 20)])
            .await
            .unwrap();

        assert_eq!(repo.store().current_version("s1"), Some(2));
        assert_eq!(repo.load("s1").await.unwrap().total, 30);
    }

    #[tokio::test]
    async fn inject_concurrent_event_appends_single_event() {
        let repo = repository();
        repo.seed_events(vec![points(1, 100)]).await.unwrap();
        repo.inject_concurrent_event(points(2, 50)).await.unwrap();

        assert_eq!(repo.store().current_version("s1"), Some(2));
        assert_eq!(repo.load("s1").await.unwrap().total, 150);
    }

    #[tokio::test]
    async fn inject_record_bypasses_serializer() {
        let repo = repository();
        repo.inject_record("s1", Record::new(1, b"{\"t\":\"points-added\",\"d\":42}".to_vec()))
            .await
            .unwrap();

        let err = repo.load("s1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
    }
}
