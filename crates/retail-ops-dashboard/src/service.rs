//! Dashboard service implementation.
//!
//! `DashboardService` ties the pieces together: it reads tables through a
//! [`RecordSource`] behind a [`QueryCache`], parses rows at the boundary, and
//! hands the records to the aggregation engine. Status updates go straight to
//! the source and invalidate every cached query of the touched table.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use retail_ops_aggregate::{
    daily_history_for_rows, rolling_trend, summarize_by_store, summarize_by_store_day, DayWindow, RowHistory,
    SummaryRow, TrendPoint,
};
use retail_ops_client::{RecordSource, TableQuery};
use retail_ops_core::{
    parse_rows, parse_snapshots, FieldMap, ItemId, ParseReport, RecordId, SnapshotFieldMap, Store, TaskStatus,
};
use serde_json::{Map, Value};

use crate::cache::{QueryCache, QueryKey, QueryState};
use crate::error::{DashboardError, Result};
use crate::types::{DashboardConfig, Grouping};

/// Longest window a trend or history request may ask for.
pub const MAX_WINDOW_DAYS: u32 = 366;

const STORES_KEY: &str = "list_stores";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Reads, aggregates and updates dashboard data.
pub struct DashboardService<S: RecordSource> {
    source: Arc<S>,
    config: DashboardConfig,
    rows: QueryCache<Vec<Value>>,
    stores: QueryCache<Vec<Store>>,
    clock: Clock,
}

impl<S: RecordSource> fmt::Debug for DashboardService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardService")
            .field("config", &self.config)
            .field("rows", &self.rows)
            .field("stores", &self.stores)
            .finish_non_exhaustive()
    }
}

impl<S: RecordSource + 'static> DashboardService<S> {
    /// Create a new dashboard service.
    #[must_use]
    pub fn new(source: Arc<S>, config: DashboardConfig) -> Self {
        let ttl = config.cache_ttl();
        Self {
            source,
            config,
            rows: QueryCache::new(ttl),
            stores: QueryCache::new(ttl),
            clock: Arc::new(Utc::now),
        }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(source: Arc<S>) -> Self {
        Self::new(source, DashboardConfig::default())
    }

    /// Replace the wall clock used for "today" and completion timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Get a reference to the data source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// The window of `days` days ending today in the display timezone.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::InvalidRequest` if `days` exceeds
    /// [`MAX_WINDOW_DAYS`].
    pub fn window(&self, days: u32) -> Result<DayWindow> {
        if days > MAX_WINDOW_DAYS {
            return Err(DashboardError::InvalidRequest(format!(
                "window of {days} days exceeds the maximum of {MAX_WINDOW_DAYS}"
            )));
        }
        Ok(DayWindow::ending_today(self.config.timezone, (self.clock)(), days))
    }

    /// Fetch the raw rows of `query`, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Client` if the request fails.
    pub async fn rows(&self, query: &TableQuery) -> Result<Arc<Vec<Value>>> {
        let source = Arc::clone(&self.source);
        let request = query.clone();
        let rows = self
            .rows
            .fetch(QueryKey::from(query), move || async move { source.select(&request).await })
            .await?;
        Ok(rows)
    }

    /// What a view of `query` would show right now, without fetching.
    #[must_use]
    pub fn rows_state(&self, query: &TableQuery) -> QueryState<Vec<Value>> {
        self.rows.snapshot(&QueryKey::from(query))
    }

    /// Fetch and parse the rows of `query`.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Client` if the request fails. Malformed rows
    /// are not errors; they are counted in the report.
    pub async fn records(&self, query: &TableQuery, fields: &FieldMap) -> Result<ParseReport> {
        let rows = self.rows(query).await?;
        let report = parse_rows(&rows, fields);
        tracing::debug!(
            table = %query.table,
            valid = report.records.len(),
            skipped = report.skipped_total(),
            "Parsed query rows"
        );
        Ok(report)
    }

    /// The store list, used to label summary rows.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Client` if the request fails.
    pub async fn stores(&self) -> Result<Arc<Vec<Store>>> {
        let source = Arc::clone(&self.source);
        let stores = self
            .stores
            .fetch(QueryKey::new(STORES_KEY, STORES_KEY), move || async move {
                source.list_stores().await
            })
            .await?;
        Ok(stores)
    }

    /// Per-status summary of `query`'s rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a request fails or the window is too long.
    pub async fn status_summary(
        &self,
        query: &TableQuery,
        fields: &FieldMap,
        grouping: Grouping,
    ) -> Result<Vec<SummaryRow>> {
        match grouping {
            Grouping::Store => {
                let (report, stores) = futures::try_join!(self.records(query, fields), self.stores())?;
                Ok(summarize_by_store(&report.records, &stores))
            }
            Grouping::StoreDay { days } => {
                let window = days.map(|days| self.window(days)).transpose()?;
                let query = match &window {
                    Some(window) => since(query, &fields.date, window),
                    None => query.clone(),
                };
                let (report, stores) = futures::try_join!(self.records(&query, fields), self.stores())?;
                Ok(summarize_by_store_day(
                    &report.records,
                    &stores,
                    self.config.timezone,
                    window.as_ref(),
                ))
            }
        }
    }

    /// Daily status counts over the last `days` days (default
    /// [`DashboardConfig::trend_days`]), oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the window is too long.
    pub async fn trend(&self, query: &TableQuery, fields: &FieldMap, days: Option<u32>) -> Result<Vec<TrendPoint>> {
        let window = self.window(days.unwrap_or(self.config.trend_days))?;
        let report = self.records(&since(query, &fields.date, &window), fields).await?;
        Ok(rolling_trend(&report.records, self.config.timezone, &window))
    }

    /// Daily stock levels of `item_ids` over the last `days` days (default
    /// [`DashboardConfig::history_days`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the window is too long.
    pub async fn stock_history(
        &self,
        query: &TableQuery,
        fields: &SnapshotFieldMap,
        item_ids: &[ItemId],
        days: Option<u32>,
    ) -> Result<Vec<RowHistory>> {
        let window = self.window(days.unwrap_or(self.config.history_days))?;
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = since(query, &fields.date, &window).in_list(fields.item.clone(), item_ids);
        let rows = self.rows(&query).await?;
        let snapshots = parse_snapshots(&rows, fields);
        Ok(daily_history_for_rows(&snapshots, item_ids, self.config.timezone, &window))
    }

    /// Set the status of row `id` in `table`.
    ///
    /// Completing a row stamps its completion time; any other status clears
    /// it. On success every cached query of `table` is invalidated.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Client` if the update fails or matches no row.
    pub async fn set_status(&self, table: &str, id: &RecordId, status: TaskStatus) -> Result<()> {
        let completed_at = if status.is_completed() {
            Value::String((self.clock)().to_rfc3339())
        } else {
            Value::Null
        };

        let mut patch = Map::new();
        patch.insert(self.config.status_column.clone(), Value::String(status.as_str().to_string()));
        patch.insert(self.config.completed_at_column.clone(), completed_at);

        self.source.update(table, id, Value::Object(patch)).await?;
        self.rows.invalidate_table(table);

        tracing::info!(table = %table, id = %id, status = %status.as_str(), "Status updated");
        Ok(())
    }

    /// Invalidate every cached query of `table`.
    pub fn invalidate_table(&self, table: &str) -> usize {
        self.rows.invalidate_table(table)
    }
}

/// Narrow `query` to rows dated on or after the window's first day.
///
/// The bound is one day early so rows that fall on the first local day but
/// an earlier UTC day are still fetched; the aggregation clips the rest.
fn since(query: &TableQuery, column: &str, window: &DayWindow) -> TableQuery {
    match window.start().and_then(|start| start.checked_sub_days(Days::new(1))) {
        Some(bound) => query.clone().gte(column, bound.format("%Y-%m-%d")),
        None => query.clone(),
    }
}
