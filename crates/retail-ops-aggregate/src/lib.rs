//! Aggregation engine for retail-ops dashboards.
//!
//! Pure, synchronous transforms from parsed [`Record`](retail_ops_core::Record)s
//! into display-ready rows:
//!
//! - [`summarize_by_store`] / [`summarize_by_store_day`]: per-status counts,
//!   completion percentage, and the `No Entry` / `All Done` / `Incomplete`
//!   classification
//! - [`rolling_trend`]: one point per calendar day of a [`DayWindow`]
//! - [`daily_history_for_rows`]: last-N-days stock levels per inventory row
//!
//! Nothing here fails on data: empty input yields empty (or zero-filled)
//! output, and every calendar day is derived through one [`DisplayTimezone`].
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use retail_ops_aggregate::{rolling_trend, DayWindow, DisplayTimezone};
//!
//! let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
//! let window = DayWindow::ending_today(DisplayTimezone::UTC, now, 7);
//!
//! let trend = rolling_trend(&[], DisplayTimezone::UTC, &window);
//! assert_eq!(trend.len(), 7);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod calendar;
pub mod error;
pub mod history;
pub mod metrics;
pub mod summary;
pub mod trend;

pub use calendar::{DayWindow, DisplayTimezone};
pub use error::{AggregateError, Result};
pub use history::{daily_history_for_rows, DayValue, RowHistory};
pub use metrics::{percent_complete, CompletionStatus, StatusCounts};
pub use summary::{completion_overview, summarize_by_store, summarize_by_store_day, Overview, SummaryRow};
pub use trend::{rolling_trend, TrendPoint};
