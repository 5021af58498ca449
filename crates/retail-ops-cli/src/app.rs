//! Application state for the live dashboard.
//!
//! Loads run as background tasks and publish into [`ViewModel`]s, so the
//! render loop never waits on the network and a slow response for an old
//! filter cannot overwrite a newer one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use retail_ops_aggregate::{DisplayTimezone, SummaryRow, TrendPoint};
use retail_ops_client::{RecordSource, TableQuery};
use retail_ops_core::FieldMap;
use retail_ops_dashboard::{DashboardService, Grouping, ViewModel, ViewState, MAX_WINDOW_DAYS};

/// Smallest window the dashboard can be narrowed to.
const MIN_DAYS: u32 = 1;

/// Build the view model for trend charts. A window without any record
/// renders as empty.
#[must_use]
pub fn trend_view() -> ViewModel<Vec<TrendPoint>> {
    ViewModel::new(|points| points.iter().all(|p| p.pending + p.in_progress + p.completed == 0))
}

/// How the summary panel groups rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    /// One row per store.
    Store,
    /// One row per store and day of the window.
    StoreDay,
}

impl SummaryMode {
    /// Display name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Store => "by store",
            Self::StoreDay => "by store and day",
        }
    }

    const fn toggled(self) -> Self {
        match self {
            Self::Store => Self::StoreDay,
            Self::StoreDay => Self::Store,
        }
    }
}

/// Everything the UI needs for one frame.
#[derive(Debug, Clone)]
pub struct Screen {
    /// Table being watched.
    pub table: String,
    /// Backend URL.
    pub backend: String,
    /// Display timezone.
    pub timezone: DisplayTimezone,
    /// Summary grouping.
    pub mode: SummaryMode,
    /// Window length in days.
    pub days: u32,
    /// Summary panel state.
    pub summary: ViewState<Vec<SummaryRow>>,
    /// Trend panel state.
    pub trend: ViewState<Vec<TrendPoint>>,
    /// When the last refresh was started.
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Live dashboard state.
pub struct App<S: RecordSource + 'static> {
    service: Arc<DashboardService<S>>,
    backend: String,
    query: TableQuery,
    fields: FieldMap,
    summary: Arc<ViewModel<Vec<SummaryRow>>>,
    trend: Arc<ViewModel<Vec<TrendPoint>>>,
    /// Summary grouping.
    pub mode: SummaryMode,
    /// Window length in days.
    pub days: u32,
    /// Set when the user asked to quit.
    pub should_quit: bool,
    last_refresh: Option<DateTime<Utc>>,
}

impl<S: RecordSource + 'static> App<S> {
    /// Create the app for `query`.
    pub fn new(
        service: Arc<DashboardService<S>>,
        backend: impl Into<String>,
        query: TableQuery,
        fields: FieldMap,
        days: u32,
    ) -> Self {
        Self {
            service,
            backend: backend.into(),
            query,
            fields,
            summary: Arc::new(ViewModel::default()),
            trend: Arc::new(trend_view()),
            mode: SummaryMode::Store,
            days: days.clamp(MIN_DAYS, MAX_WINDOW_DAYS),
            should_quit: false,
            last_refresh: None,
        }
    }

    /// Identity of the current filter state.
    fn filter_key(&self) -> String {
        format!("{}|{:?}|{}", self.query.cache_key(), self.mode, self.days)
    }

    fn grouping(&self) -> Grouping {
        match self.mode {
            SummaryMode::Store => Grouping::Store,
            SummaryMode::StoreDay => Grouping::StoreDay { days: Some(self.days) },
        }
    }

    /// Start loading both panels. With `force`, cached rows of the table are
    /// discarded first.
    ///
    /// Tickets are taken here, before any task is spawned, so the last call
    /// wins regardless of the order the runtime schedules the loads in.
    pub fn refresh(&mut self, force: bool) {
        if force {
            self.service.invalidate_table(&self.query.table);
        }
        self.last_refresh = Some(Utc::now());
        let key = self.filter_key();
        tracing::debug!(filter = %key, force, "Refreshing dashboard");

        let ticket = self.summary.begin(key.clone());
        let service = Arc::clone(&self.service);
        let view = Arc::clone(&self.summary);
        let query = self.query.clone();
        let fields = self.fields.clone();
        let grouping = self.grouping();
        tokio::spawn(async move {
            let result = service.status_summary(&query, &fields, grouping).await;
            view.apply(&ticket, result);
        });

        let ticket = self.trend.begin(key);
        let service = Arc::clone(&self.service);
        let view = Arc::clone(&self.trend);
        let query = self.query.clone();
        let fields = self.fields.clone();
        let days = self.days;
        tokio::spawn(async move {
            let result = service.trend(&query, &fields, Some(days)).await;
            view.apply(&ticket, result);
        });
    }

    /// Switch between per-store and per-store-per-day summaries.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.refresh(false);
    }

    /// Widen the window by one day.
    pub fn widen(&mut self) {
        if self.days < MAX_WINDOW_DAYS {
            self.days += 1;
            self.refresh(false);
        }
    }

    /// Narrow the window by one day.
    pub fn narrow(&mut self) {
        if self.days > MIN_DAYS {
            self.days -= 1;
            self.refresh(false);
        }
    }

    /// Snapshot the state for rendering.
    pub fn screen(&self) -> Screen {
        Screen {
            table: self.query.table.clone(),
            backend: self.backend.clone(),
            timezone: self.service.config().timezone,
            mode: self.mode,
            days: self.days,
            summary: self.summary.state(),
            trend: self.trend.state(),
            last_refresh: self.last_refresh,
        }
    }
}
