//! Error types for the dashboard service.

use thiserror::Error;

/// A result type using `DashboardError`.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Errors that can occur serving dashboard data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// The backend request failed.
    #[error(transparent)]
    Client(#[from] retail_ops_client::ClientError),

    /// The request itself is unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DashboardError {
    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Client(err) => err.is_retriable(),
            Self::InvalidRequest(_) => false,
        }
    }
}
