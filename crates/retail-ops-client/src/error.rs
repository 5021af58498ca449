//! Client error types.

use thiserror::Error;

/// A result type using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur talking to the backend.
///
/// Errors are cloneable so a single failed request can be reported to every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, TLS, connection, timeout).
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the backend.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("invalid response: {0}")]
    Decode(String),

    /// An update matched no row.
    #[error("no row with id {id} in {table}")]
    NotFound {
        /// Table that was updated.
        table: String,
        /// Row id that matched nothing.
        id: String,
    },

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns `true` if retrying the same request might succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::NotFound { .. } | Self::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_errors() {
        assert!(ClientError::Transport("timeout".into()).is_retriable());
        assert!(ClientError::Api { status: 503, message: "down".into() }.is_retriable());
        assert!(ClientError::Api { status: 429, message: "slow down".into() }.is_retriable());
        assert!(!ClientError::Api { status: 401, message: "bad key".into() }.is_retriable());
        assert!(!ClientError::Decode("eof".into()).is_retriable());
        assert!(!ClientError::NotFound { table: "tasks".into(), id: "1".into() }.is_retriable());
    }

    #[test]
    fn display_messages() {
        let err = ClientError::Api {
            status: 400,
            message: "column does not exist".into(),
        };
        assert_eq!(err.to_string(), "backend error (400): column does not exist");
    }
}
