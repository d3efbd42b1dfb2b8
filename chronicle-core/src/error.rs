//! Coded, chained error type shared by every layer.
//!
//! Stores and serializers originate errors tagged with an [`ErrorKind`]. The
//! repository wraps failures it cannot resolve (a fold failure becomes
//! [`ErrorKind::UnhandledEvent`] with the aggregate's own error as its cause)
//! and passes everything else through unchanged. Inspect errors with
//! [`has_kind`] or [`is_not_found`]; both walk the full `source()` chain.

use std::{error::Error as StdError, fmt};

use thiserror::Error;

/// Boxed cause carried by an [`Error`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed an incorrect value.
    InvalidArgument,
    /// An event or envelope could not be encoded or decoded.
    InvalidEncoding,
    /// A record carries a type tag the serializer has no binding for.
    UnboundEventType,
    /// The store holds no history for the requested aggregate.
    AggregateNotFound,
    /// The store failed to persist records.
    AggregateNotSaved,
    /// The aggregate rejected a command.
    UnhandledCommand,
    /// The aggregate failed to fold an event.
    UnhandledEvent,
    /// A record's version is not greater than the latest stored version.
    Conflict,
}

impl ErrorKind {
    /// Short phrase naming the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::InvalidEncoding => "invalid encoding",
            Self::UnboundEventType => "unbound event type",
            Self::AggregateNotFound => "aggregate not found",
            Self::AggregateNotSaved => "aggregate not saved",
            Self::UnhandledCommand => "unhandled command",
            Self::UnhandledEvent => "unhandled event",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by stores, serializers and the repository.
#[derive(Debug, Error)]
#[error("{}", render(.message, .source.as_deref()))]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

fn render(message: &str, source: Option<&(dyn StdError + Send + Sync + 'static)>) -> String {
    match source {
        Some(cause) => format!("{message}: {cause}"),
        None => message.to_string(),
    }
}

impl Error {
    /// An error of `kind` with no cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// A caller passed something the operation cannot accept.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Bytes could not be encoded or decoded.
    pub fn invalid_encoding(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::InvalidEncoding, message).with_source(source)
    }

    /// No serializer binding exists for `tag`.
    pub fn unbound_event_type(tag: &str) -> Self {
        Self::new(
            ErrorKind::UnboundEventType,
            format!("unbound event type, {tag}"),
        )
    }

    /// The aggregate has no stored history.
    pub fn not_found(aggregate_id: &str) -> Self {
        Self::new(
            ErrorKind::AggregateNotFound,
            format!("no aggregate found with id, {aggregate_id}"),
        )
    }

    /// A backend failed to persist the aggregate's records.
    pub fn not_saved(aggregate_id: &str, source: impl Into<BoxError>) -> Self {
        Self::new(
            ErrorKind::AggregateNotSaved,
            format!("unable to save aggregate, {aggregate_id}"),
        )
        .with_source(source)
    }

    /// The aggregate rejected a command; `source` is its error.
    pub fn unhandled_command(source: impl Into<BoxError>) -> Self {
        Self::new(
            ErrorKind::UnhandledCommand,
            "aggregate was unable to handle command",
        )
        .with_source(source)
    }

    /// The aggregate failed to fold an event of `event_type`.
    pub fn unhandled_event(event_type: &str, source: impl Into<BoxError>) -> Self {
        Self::new(
            ErrorKind::UnhandledEvent,
            format!("aggregate was unable to handle event, {event_type}"),
        )
        .with_source(source)
    }

    /// Another writer already stored the versions; `source` is usually a
    /// [`VersionConflict`](crate::concurrency::VersionConflict).
    pub fn conflict(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Conflict, "version conflict").with_source(source)
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message without the cause appended.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The directly wrapped cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Whether this error or any error in its cause chain has `kind`.
    #[must_use]
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        has_kind(self, kind)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.has_kind(ErrorKind::AggregateNotFound)
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.has_kind(ErrorKind::Conflict)
    }
}

/// Whether `err` or any error in its `source()` chain is an [`Error`] of
/// `kind`.
///
/// Foreign errors in the chain are skipped over rather than ending the walk,
/// so an [`Error`] wrapped by a caller's own error type is still found.
#[must_use]
pub fn has_kind(err: &(dyn StdError + 'static), kind: ErrorKind) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.downcast_ref::<Error>().is_some_and(|e| e.kind == kind) {
            return true;
        }
        current = err.source();
    }
    false
}

/// Whether the error chain reports a missing aggregate.
#[must_use]
pub fn is_not_found(err: &(dyn StdError + 'static)) -> bool {
    has_kind(err, ErrorKind::AggregateNotFound)
}
