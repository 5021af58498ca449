//! Error types for the aggregation layer.
//!
//! Aggregation itself is total; the only fallible step is reading
//! configuration such as the display timezone.

use thiserror::Error;

/// A result type using `AggregateError`.
pub type Result<T> = std::result::Result<T, AggregateError>;

/// Errors raised while configuring aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The timezone name is not in the IANA database.
    #[error("unknown timezone: {0:?}")]
    UnknownTimezone(String),
}
