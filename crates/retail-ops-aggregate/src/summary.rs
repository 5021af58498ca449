//! Status summaries grouped by store, or by store and calendar day.
//!
//! Buckets live only for the duration of one call. Output order is fixed:
//! date descending when the key has a date, then label ascending
//! (case-insensitive), then key, so the same input always yields the same
//! rows.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use retail_ops_core::{Record, Store, StoreId};
use serde::{Deserialize, Serialize};

use crate::calendar::{DayWindow, DisplayTimezone};
use crate::metrics::{CompletionStatus, StatusCounts};

/// One display-ready row of a status summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Stable row key: the store id, or `store_id@YYYY-MM-DD` for daily rows.
    pub key: String,
    /// Store the row belongs to.
    pub store_id: StoreId,
    /// Human-readable store label.
    pub label: String,
    /// Calendar day for daily rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Per-status tallies.
    #[serde(flatten)]
    pub counts: StatusCounts,
    /// Three-way classification of the bucket.
    pub status: CompletionStatus,
    /// Completion percentage in `[0, 100]`.
    pub percent: u8,
}

impl SummaryRow {
    fn new(store_id: StoreId, date: Option<NaiveDate>, counts: StatusCounts, labels: &Labels<'_>) -> Self {
        let key = match date {
            Some(day) => format!("{store_id}@{day}"),
            None => store_id.to_string(),
        };
        Self {
            key,
            label: labels.label(&store_id),
            store_id,
            date,
            status: counts.classify(),
            percent: counts.percent(),
            counts,
        }
    }
}

/// Store id to display label lookup. The first entry for a duplicated id wins.
struct Labels<'a>(HashMap<&'a StoreId, &'a str>);

impl<'a> Labels<'a> {
    fn new(stores: &'a [Store]) -> Self {
        let mut map = HashMap::with_capacity(stores.len());
        for store in stores {
            map.entry(&store.id).or_insert_with(|| store.label());
        }
        Self(map)
    }

    fn label(&self, id: &StoreId) -> String {
        self.0
            .get(id)
            .map_or_else(|| id.to_string(), |label| (*label).to_string())
    }
}

fn compare_rows(a: &SummaryRow, b: &SummaryRow) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
        .then_with(|| a.key.cmp(&b.key))
}

/// Summarize records per store.
///
/// Every store in `stores` gets a row, so stores with nothing recorded show
/// up as `No Entry`. Stores that appear only in `records` get a row labelled
/// with their raw key.
#[must_use]
pub fn summarize_by_store(records: &[Record], stores: &[Store]) -> Vec<SummaryRow> {
    let labels = Labels::new(stores);

    let mut buckets: BTreeMap<&StoreId, StatusCounts> = stores
        .iter()
        .map(|store| (&store.id, StatusCounts::default()))
        .collect();
    for record in records {
        buckets.entry(&record.store_id).or_default().record(record.status);
    }

    let mut rows: Vec<SummaryRow> = buckets
        .into_iter()
        .map(|(store_id, counts)| SummaryRow::new(store_id.clone(), None, counts, &labels))
        .collect();
    rows.sort_by(compare_rows);
    rows
}

/// Summarize records per store and calendar day.
///
/// With a `window`, every store in `stores` gets a row for every day of the
/// window and records outside the window are ignored. Without one, only the
/// (store, day) pairs that occur in `records` are returned.
#[must_use]
pub fn summarize_by_store_day(
    records: &[Record],
    stores: &[Store],
    tz: DisplayTimezone,
    window: Option<&DayWindow>,
) -> Vec<SummaryRow> {
    let labels = Labels::new(stores);

    let mut buckets: BTreeMap<(NaiveDate, &StoreId), StatusCounts> = BTreeMap::new();
    if let Some(window) = window {
        for day in window.days() {
            for store in stores {
                buckets.entry((day, &store.id)).or_default();
            }
        }
    }

    for record in records {
        let day = tz.day_of(&record.occurred_at);
        if window.is_some_and(|w| !w.contains(day)) {
            continue;
        }
        buckets.entry((day, &record.store_id)).or_default().record(record.status);
    }

    let mut rows: Vec<SummaryRow> = buckets
        .into_iter()
        .map(|((day, store_id), counts)| SummaryRow::new(store_id.clone(), Some(day), counts, &labels))
        .collect();
    rows.sort_by(compare_rows);
    rows
}

/// Headline numbers for a set of summary rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    /// Number of rows.
    pub rows: usize,
    /// Rows classified `All Done`.
    pub all_done: usize,
    /// Rows classified `Incomplete`.
    pub incomplete: usize,
    /// Rows classified `No Entry`.
    pub no_entry: usize,
    /// Records across all rows.
    pub total: usize,
    /// Completed records across all rows.
    pub completed: usize,
    /// Overall completion percentage.
    pub percent: u8,
}

/// Roll summary rows up into dashboard card figures.
#[must_use]
pub fn completion_overview(rows: &[SummaryRow]) -> Overview {
    let mut overview = Overview {
        rows: rows.len(),
        ..Overview::default()
    };
    for row in rows {
        match row.status {
            CompletionStatus::AllDone => overview.all_done += 1,
            CompletionStatus::Incomplete => overview.incomplete += 1,
            CompletionStatus::NoEntry => overview.no_entry += 1,
        }
        overview.total += row.counts.total;
        overview.completed += row.counts.completed;
    }
    overview.percent = crate::metrics::percent_complete(overview.completed, overview.total);
    overview
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use retail_ops_core::{parse_rows, FieldMap, RecordTime, TaskStatus};
    use serde_json::json;

    fn store(id: &str, name: &str) -> Store {
        Store::new(id.parse().unwrap(), name)
    }

    fn record(id: u32, store: &str, day: u32, status: Option<TaskStatus>) -> Record {
        Record {
            id: Some(id.to_string().parse().unwrap()),
            store_id: store.parse().unwrap(),
            occurred_at: RecordTime::Date(NaiveDate::from_ymd_opt(2024, 5, day).unwrap()),
            status,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn groups_by_store_with_null_status() {
        let rows = vec![
            json!({"store_id": 1, "created_at": "2024-05-01", "status": "completed"}),
            json!({"store_id": 1, "created_at": "2024-05-01", "status": "pending"}),
            json!({"store_id": 2, "created_at": "2024-05-01", "status": null}),
        ];
        let report = parse_rows(&rows, &FieldMap::default());
        assert_eq!(report.without_id, 3);
        let summary = summarize_by_store(&report.records, &[]);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].key, "1");
        assert_eq!(summary[0].counts.total, 2);
        assert_eq!(summary[0].counts.completed, 1);
        assert_eq!(summary[0].status, CompletionStatus::Incomplete);
        assert_eq!(summary[0].percent, 50);

        assert_eq!(summary[1].key, "2");
        assert_eq!(summary[1].counts.total, 1);
        assert_eq!(summary[1].counts.completed, 0);
        assert_eq!(summary[1].status, CompletionStatus::Incomplete);
    }

    #[test]
    fn known_stores_without_records_are_no_entry() {
        let stores = vec![store("1", "Downtown"), store("2", "airport")];
        let records = vec![
            record(1, "1", 1, Some(TaskStatus::Completed)),
            record(2, "1", 1, Some(TaskStatus::Completed)),
        ];
        let summary = summarize_by_store(&records, &stores);

        // Sorted case-insensitively by label.
        assert_eq!(summary[0].label, "airport");
        assert_eq!(summary[0].status, CompletionStatus::NoEntry);
        assert_eq!(summary[0].percent, 0);
        assert_eq!(summary[1].label, "Downtown");
        assert_eq!(summary[1].status, CompletionStatus::AllDone);
        assert_eq!(summary[1].percent, 100);
    }

    #[test]
    fn unknown_store_labelled_by_key() {
        let stores = vec![store("1", "Downtown")];
        let records = vec![record(1, "99", 1, None)];
        let summary = summarize_by_store(&records, &stores);
        let orphan = summary.iter().find(|r| r.key == "99").unwrap();
        assert_eq!(orphan.label, "99");
    }

    #[test]
    fn daily_rows_sorted_date_desc_then_label() {
        let stores = vec![store("1", "beta"), store("2", "Alpha")];
        let records = vec![
            record(1, "1", 1, Some(TaskStatus::Completed)),
            record(2, "2", 1, Some(TaskStatus::Pending)),
            record(3, "1", 3, Some(TaskStatus::InProgress)),
        ];
        let summary = summarize_by_store_day(&records, &stores, DisplayTimezone::UTC, None);

        let keys: Vec<_> = summary.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["1@2024-05-03", "2@2024-05-01", "1@2024-05-01"]);
        assert_eq!(summary[0].counts.in_progress, 1);
    }

    #[test]
    fn window_fills_every_store_day() {
        let stores = vec![store("1", "A"), store("2", "B")];
        let records = vec![
            record(1, "1", 5, Some(TaskStatus::Completed)),
            // Outside the window.
            record(2, "2", 1, Some(TaskStatus::Pending)),
        ];
        let window = DayWindow::ending_on(date(5), 3);
        let summary = summarize_by_store_day(&records, &stores, DisplayTimezone::UTC, Some(&window));

        assert_eq!(summary.len(), 6);
        assert_eq!(summary[0].date, Some(date(5)));
        assert_eq!(summary[0].status, CompletionStatus::AllDone);
        assert!(summary[1..].iter().all(|r| r.status == CompletionStatus::NoEntry));
        assert!(summary.iter().all(|r| r.date.is_some_and(|d| window.contains(d))));
    }

    #[test]
    fn day_follows_display_timezone() {
        let stores = vec![store("1", "A")];
        let late_evening_ny = Record {
            id: Some("1".parse().unwrap()),
            store_id: "1".parse().unwrap(),
            occurred_at: RecordTime::Instant(Utc.with_ymd_and_hms(2024, 5, 2, 1, 0, 0).unwrap()),
            status: Some(TaskStatus::Completed),
        };
        let ny: DisplayTimezone = "America/New_York".parse().unwrap();

        let utc_rows = summarize_by_store_day(&[late_evening_ny.clone()], &stores, DisplayTimezone::UTC, None);
        let ny_rows = summarize_by_store_day(&[late_evening_ny], &stores, ny, None);
        assert_eq!(utc_rows[0].date, Some(date(2)));
        assert_eq!(ny_rows[0].date, Some(date(1)));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let stores = vec![store("2", "same"), store("1", "Same")];
        let records = vec![
            record(1, "1", 2, Some(TaskStatus::Completed)),
            record(2, "2", 2, None),
            record(3, "2", 1, Some(TaskStatus::Pending)),
        ];
        let first = serde_json::to_string(&summarize_by_store_day(&records, &stores, DisplayTimezone::UTC, None)).unwrap();
        let second = serde_json::to_string(&summarize_by_store_day(&records, &stores, DisplayTimezone::UTC, None)).unwrap();
        assert_eq!(first, second);

        // Equal labels (ignoring case) fall back to the key.
        let by_store = summarize_by_store(&records, &stores);
        assert_eq!(by_store[0].key, "1");
        assert_eq!(by_store[1].key, "2");
    }

    #[test]
    fn serialized_row_shape() {
        let summary = summarize_by_store(&[record(1, "1", 1, Some(TaskStatus::Completed))], &[store("1", "Main")]);
        let value = serde_json::to_value(&summary[0]).unwrap();
        assert_eq!(value["key"], "1");
        assert_eq!(value["label"], "Main");
        assert_eq!(value["total"], 1);
        assert_eq!(value["completed"], 1);
        assert_eq!(value["status"], "All Done");
        assert_eq!(value["percent"], 100);
        assert!(value.get("date").is_none());
    }

    #[test]
    fn overview_rolls_up_rows() {
        let stores = vec![store("1", "A"), store("2", "B"), store("3", "C")];
        let records = vec![
            record(1, "1", 1, Some(TaskStatus::Completed)),
            record(2, "2", 1, Some(TaskStatus::Completed)),
            record(3, "2", 1, Some(TaskStatus::Pending)),
        ];
        let overview = completion_overview(&summarize_by_store(&records, &stores));
        assert_eq!(overview.rows, 3);
        assert_eq!(overview.all_done, 1);
        assert_eq!(overview.incomplete, 1);
        assert_eq!(overview.no_entry, 1);
        assert_eq!(overview.total, 3);
        assert_eq!(overview.percent, 67);
    }

    #[test]
    fn empty_input() {
        assert!(summarize_by_store(&[], &[]).is_empty());
        assert_eq!(completion_overview(&[]), Overview::default());
    }
}
