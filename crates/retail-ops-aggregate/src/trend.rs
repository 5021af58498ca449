//! Rolling-window day bucketing for trend charts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use retail_ops_core::{Record, TaskStatus};
use serde::{Deserialize, Serialize};

use crate::calendar::{DayWindow, DisplayTimezone};

/// Per-status counts for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// The calendar day.
    pub date: NaiveDate,
    /// Pending records on that day.
    pub pending: usize,
    /// In-progress records on that day.
    pub in_progress: usize,
    /// Completed records on that day.
    pub completed: usize,
}

impl TrendPoint {
    const fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            pending: 0,
            in_progress: 0,
            completed: 0,
        }
    }
}

/// Bucket records into one point per day of `window`, oldest first.
///
/// The output always has `window.len()` points; days without records are
/// zero. Records outside the window and records with an unknown status are
/// not counted.
#[must_use]
pub fn rolling_trend(records: &[Record], tz: DisplayTimezone, window: &DayWindow) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, TrendPoint> =
        window.days().map(|day| (day, TrendPoint::empty(day))).collect();

    for record in records {
        let day = tz.day_of(&record.occurred_at);
        let Some(point) = buckets.get_mut(&day) else {
            continue;
        };
        match record.status {
            Some(TaskStatus::Pending) => point.pending += 1,
            Some(TaskStatus::InProgress) => point.in_progress += 1,
            Some(TaskStatus::Completed) => point.completed += 1,
            None => {}
        }
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use retail_ops_core::{parse_rows, FieldMap, RecordTime};
    use serde_json::json;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn empty_records_yield_full_window() {
        let window = DayWindow::ending_on(date(10), 7);
        let trend = rolling_trend(&[], DisplayTimezone::UTC, &window);
        assert_eq!(trend.len(), 7);
        assert!(trend
            .iter()
            .all(|p| p.pending == 0 && p.in_progress == 0 && p.completed == 0));
        assert_eq!(trend.first().unwrap().date, date(4));
        assert_eq!(trend.last().unwrap().date, date(10));
    }

    #[test]
    fn counts_by_day_and_status() {
        let rows = vec![
            json!({"id": 1, "store_id": 1, "created_at": "2024-05-09T10:00:00Z", "status": "in progress"}),
            json!({"id": 2, "store_id": 1, "created_at": "2024-05-09T11:00:00Z", "status": "in_progress"}),
            json!({"id": 3, "store_id": 2, "created_at": "2024-05-10", "status": "completed"}),
            json!({"id": 4, "store_id": 2, "created_at": "2024-05-10", "status": "pending"}),
            json!({"id": 5, "store_id": 2, "created_at": "2024-05-10", "status": null}),
            json!({"id": 6, "store_id": 2, "created_at": "2024-04-01", "status": "pending"}),
        ];
        let records = parse_rows(&rows, &FieldMap::default()).records;
        let window = DayWindow::ending_on(date(10), 3);
        let trend = rolling_trend(&records, DisplayTimezone::UTC, &window);

        assert_eq!(
            trend,
            vec![
                TrendPoint::empty(date(8)),
                TrendPoint { date: date(9), pending: 0, in_progress: 2, completed: 0 },
                TrendPoint { date: date(10), pending: 1, in_progress: 0, completed: 1 },
            ]
        );
    }

    #[test]
    fn window_length_independent_of_data() {
        let record = Record {
            id: None,
            store_id: "1".parse().unwrap(),
            occurred_at: RecordTime::Date(date(10)),
            status: Some(TaskStatus::Completed),
        };
        for days in [0, 1, 5, 30] {
            let window = DayWindow::ending_on(date(10), days);
            let trend = rolling_trend(std::slice::from_ref(&record), DisplayTimezone::UTC, &window);
            assert_eq!(trend.len(), days as usize);
        }
    }
}
