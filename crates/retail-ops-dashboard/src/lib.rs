//! Fetch layer and dashboard service for retail-ops.
//!
//! This crate sits between the backend client and whatever renders the
//! dashboards. Data flows one way:
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │  RecordSource    │────▶│   QueryCache     │────▶│  Aggregation     │
//! │  (REST backend)  │     │  (TTL + dedup)   │     │  (pure fns)      │
//! └──────────────────┘     └──────────────────┘     └────────┬─────────┘
//!          ▲                                                  │
//!          │ set_status + invalidate                 ┌────────▼─────────┐
//!          └─────────────────────────────────────────│   ViewModel      │
//!                                                    │  (last-write-    │
//!                                                    │   wins state)    │
//!                                                    └──────────────────┘
//! ```
//!
//! - [`QueryCache`]: memoizes rows per query, shares concurrent requests, and
//!   keeps stale data readable while a refetch runs
//! - [`ViewModel`]: loading / ready / empty / error state that ignores
//!   responses for superseded filters
//! - [`DashboardService`]: status summaries, trends and stock history over a
//!   [`RecordSource`](retail_ops_client::RecordSource)
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use retail_ops_client::{BackendConfig, RestClient, TableQuery};
//! use retail_ops_core::FieldMap;
//! use retail_ops_dashboard::{DashboardService, Grouping};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RestClient::new(BackendConfig::new("https://ops.example.com", "anon-key"))?;
//! let service = DashboardService::with_defaults(Arc::new(client));
//!
//! let rows = service
//!     .status_summary(&TableQuery::new("tasks"), &FieldMap::default(), Grouping::Store)
//!     .await?;
//! for row in rows {
//!     println!("{}: {}% ({})", row.label, row.percent, row.status);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod error;
pub mod service;
pub mod types;
pub mod view;

pub use cache::{QueryCache, QueryKey, QueryState};
pub use error::{DashboardError, Result};
pub use service::{DashboardService, MAX_WINDOW_DAYS};
pub use types::{DashboardConfig, Grouping};
pub use view::{RequestGuard, Ticket, ViewModel, ViewState};
