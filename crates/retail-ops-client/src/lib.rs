//! Remote data source for retail-ops.
//!
//! The dashboards read task, log and stock tables from a REST backend that
//! speaks the `PostgREST` query dialect. This crate provides:
//!
//! - [`TableQuery`]: a typed "select rows from table T matching F ordered by O"
//! - [`RecordSource`]: the trait the fetch layer talks to
//! - [`RestClient`]: the HTTP implementation
//! - `InMemorySource`: a table-backed implementation for tests
//!   (`test-utils` feature)
//!
//! # Example
//!
//! ```no_run
//! use retail_ops_client::{BackendConfig, RecordSource, RestClient, TableQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BackendConfig::new("https://ops.example.com", "anon-key");
//! let client = RestClient::new(config)?;
//!
//! let query = TableQuery::new("tasks")
//!     .gte("created_at", "2024-05-01")
//!     .order_desc("created_at");
//! let rows = client.select(&query).await?;
//! println!("{} rows", rows.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod query;
pub mod rest;
pub mod source;

pub use error::{ClientError, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemorySource;
pub use query::{Direction, Filter, FilterOp, Order, TableQuery};
pub use rest::RestClient;
pub use source::RecordSource;

/// Connection settings for the backend.
#[derive(Clone, Deserialize)]
pub struct BackendConfig {
    /// Project URL (e.g., `https://ops.example.com`).
    pub base_url: String,

    /// Public API key, sent as the `apikey` header.
    pub api_key: String,

    /// User access token. When absent the API key is used as bearer token.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "BackendConfig::default_timeout")]
    pub timeout_seconds: u64,

    /// Table holding the store list.
    #[serde(default = "BackendConfig::default_stores_table")]
    pub stores_table: String,
}

impl BackendConfig {
    /// Settings for `base_url` authenticated with `api_key`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            timeout_seconds: Self::default_timeout(),
            stores_table: Self::default_stores_table(),
        }
    }

    /// Use a user access token for the `Authorization` header.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    const fn default_timeout() -> u64 {
        30
    }

    fn default_stores_table() -> String {
        "stores".to_string()
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Get the endpoint URL of a table.
    #[must_use]
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url.trim_end_matches('/'))
    }

    /// The bearer token sent with every request.
    #[must_use]
    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("stores_table", &self.stores_table)
            .finish()
    }
}
