//! Common error types for retail-ops.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the retail-ops system.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// A status string matched none of the accepted spellings.
    #[error("unknown status: {0:?}")]
    UnknownStatus(String),

    /// A date or timestamp could not be parsed.
    #[error("invalid date: {0:?}")]
    InvalidDate(String),
}
