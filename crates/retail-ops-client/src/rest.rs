//! HTTP client for the REST backend.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use retail_ops_core::{RecordId, Store};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::query::TableQuery;
use crate::source::RecordSource;
use crate::BackendConfig;

/// HTTP implementation of [`RecordSource`].
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    config: BackendConfig,
}

/// Error body returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl RestClient {
    /// Create a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the URL is empty, a credential is
    /// not a valid header value, or the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| ClientError::Config("api key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.bearer()))
            .map_err(|_| ClientError::Config("access token is not a valid header value".to_string()))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Get the configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Turn a non-success response into [`ClientError::Api`].
    async fn api_error(table: &str, response: reqwest::Response) -> ClientError {
        let status = response.status();
        let message = match response.json::<ErrorResponse>().await {
            Ok(ErrorResponse {
                message: Some(message),
                hint,
            }) => match hint {
                Some(hint) => format!("{message} ({hint})"),
                None => message,
            },
            _ => format!("backend returned status {status}"),
        };

        tracing::warn!(table = %table, status = %status, error = %message, "Backend request failed");

        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl RecordSource for RestClient {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>> {
        let url = self.config.table_url(&query.table);

        let response = self
            .client
            .get(&url)
            .query(&query.to_params())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(&query.table, response).await);
        }

        let rows: Vec<Value> = response.json().await?;

        tracing::debug!(table = %query.table, rows = rows.len(), "Selected rows");
        Ok(rows)
    }

    async fn update(&self, table: &str, id: &RecordId, patch: Value) -> Result<()> {
        let url = self.config.table_url(table);

        let response = self
            .client
            .patch(&url)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(table, response).await);
        }

        let updated: Vec<Value> = response.json().await?;

        if updated.is_empty() {
            return Err(ClientError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }

        tracing::info!(table = %table, id = %id, "Updated row");
        Ok(())
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        let query = TableQuery::new(self.config.stores_table.clone()).order_asc("id");
        let rows = self.select(&query).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| ClientError::Decode(format!("invalid store row: {e}"))))
            .collect()
    }
}
