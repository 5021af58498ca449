//! The data source trait.

use async_trait::async_trait;
use retail_ops_core::{RecordId, Store};
use serde_json::Value;

use crate::error::Result;
use crate::query::TableQuery;

/// Read and write access to the backend's tables.
///
/// This trait abstracts the remote backend, allowing the fetch layer to run
/// against an in-memory implementation in tests.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the raw rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a JSON array.
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>>;

    /// Merge `patch` into the row of `table` whose id is `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`](crate::ClientError::NotFound) if no
    /// row matched, or an error if the request fails.
    async fn update(&self, table: &str, id: &RecordId, patch: Value) -> Result<()>;

    /// List the known stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or a row is not a valid store.
    async fn list_stores(&self) -> Result<Vec<Store>>;
}
