//! In-memory implementation of [`RecordSource`] for tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use retail_ops_core::{RecordId, Store};
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::query::{Direction, Filter, FilterOp, TableQuery};
use crate::source::RecordSource;

/// Tables of JSON rows held in memory.
///
/// Supports the same filter operators as the REST backend, an artificial
/// latency, and injected failures.
#[derive(Debug, Default)]
pub struct InMemorySource {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    stores: RwLock<Vec<Store>>,
    failure: RwLock<Option<ClientError>>,
    delay: RwLock<Option<Duration>>,
    selects: AtomicUsize,
}

impl InMemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rows of `table`.
    #[must_use]
    pub fn with_table(self, table: impl Into<String>, rows: Vec<Value>) -> Self {
        self.tables.write().insert(table.into(), rows);
        self
    }

    /// Replace the store list.
    #[must_use]
    pub fn with_stores(self, stores: Vec<Store>) -> Self {
        *self.stores.write() = stores;
        self
    }

    /// Append a row to `table`.
    pub fn insert(&self, table: &str, row: Value) {
        self.tables.write().entry(table.to_string()).or_default().push(row);
    }

    /// Make every following call fail with `error`.
    pub fn fail_with(&self, error: ClientError) {
        *self.failure.write() = Some(error);
    }

    /// Stop failing.
    pub fn recover(&self) {
        *self.failure.write() = None;
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = Some(delay);
    }

    /// Number of `select` calls served so far.
    #[must_use]
    pub fn select_calls(&self) -> usize {
        self.selects.load(AtomicOrdering::SeqCst)
    }

    /// A copy of the rows of `table`.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    async fn before_call(&self) -> Result<()> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.read().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Text form of a cell, as it appears in a query string.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compare numerically when both sides are numbers, textually otherwise.
fn compare_text(left: &str, right: &str) -> Ordering {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let cell = row.get(&filter.column).map_or_else(|| "null".to_string(), cell_text);
    let ord = compare_text(&cell, &filter.value);
    match filter.op {
        FilterOp::Eq => ord == Ordering::Equal,
        FilterOp::Neq => ord != Ordering::Equal,
        FilterOp::Gt => ord == Ordering::Greater,
        FilterOp::Gte => ord != Ordering::Less,
        FilterOp::Lt => ord == Ordering::Less,
        FilterOp::Lte => ord != Ordering::Greater,
        FilterOp::In => filter
            .value
            .split(',')
            .any(|candidate| compare_text(&cell, candidate) == Ordering::Equal),
    }
}

fn compare_rows(a: &Value, b: &Value, query: &TableQuery) -> Ordering {
    for order in &query.order {
        let left = a.get(&order.column).map(cell_text).unwrap_or_default();
        let right = b.get(&order.column).map(cell_text).unwrap_or_default();
        let ord = match order.direction {
            Direction::Asc => compare_text(&left, &right),
            Direction::Desc => compare_text(&right, &left),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>> {
        self.selects.fetch_add(1, AtomicOrdering::SeqCst);
        self.before_call().await?;

        let mut rows: Vec<Value> = self
            .tables
            .read()
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| compare_rows(a, b, query));
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn update(&self, table: &str, id: &RecordId, patch: Value) -> Result<()> {
        self.before_call().await?;

        let mut tables = self.tables.write();
        let row = tables
            .get_mut(table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row.get("id").and_then(RecordId::from_value).as_ref() == Some(id))
            })
            .ok_or_else(|| ClientError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })?;

        if let (Value::Object(target), Value::Object(fields)) = (row, patch) {
            target.extend(fields);
        }
        Ok(())
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        self.before_call().await?;
        Ok(self.stores.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> InMemorySource {
        InMemorySource::new().with_table(
            "tasks",
            vec![
                json!({"id": 1, "store_id": 1, "created_at": "2024-05-01", "status": "pending"}),
                json!({"id": 2, "store_id": 2, "created_at": "2024-05-03", "status": "completed"}),
                json!({"id": 3, "store_id": 10, "created_at": "2024-05-02", "status": "pending"}),
            ],
        )
    }

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[tokio::test]
    async fn filters_and_orders() {
        let source = source();

        let query = TableQuery::new("tasks").gte("created_at", "2024-05-02").order_desc("created_at");
        assert_eq!(ids(&source.select(&query).await.unwrap()), vec![2, 3]);

        let query = TableQuery::new("tasks").gt("store_id", 2);
        assert_eq!(ids(&source.select(&query).await.unwrap()), vec![3]);

        let query = TableQuery::new("tasks").in_list("status", ["pending"]).order_asc("id").limit(1);
        assert_eq!(ids(&source.select(&query).await.unwrap()), vec![1]);

        assert!(source.select(&TableQuery::new("missing")).await.unwrap().is_empty());
        assert_eq!(source.select_calls(), 4);
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let source = source();
        let id: RecordId = "2".parse().unwrap();
        source
            .update("tasks", &id, json!({"status": "pending", "completed_at": null}))
            .await
            .unwrap();

        let row = &source.rows("tasks")[1];
        assert_eq!(row["status"], "pending");
        assert!(row["completed_at"].is_null());
        assert_eq!(row["store_id"], 2);
    }

    #[tokio::test]
    async fn update_unknown_row() {
        let source = source();
        let id: RecordId = "99".parse().unwrap();
        let err = source.update("tasks", &id, json!({})).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[tokio::test]
    async fn injected_failure() {
        let source = source();
        source.fail_with(ClientError::Transport("offline".into()));
        assert!(source.select(&TableQuery::new("tasks")).await.is_err());

        source.recover();
        assert_eq!(source.select(&TableQuery::new("tasks")).await.unwrap().len(), 3);
    }
}
