//! Per-row daily stock history.
//!
//! Inventory tables show, next to each item, the stock level on each of the
//! last few days. A day's value is the latest count taken that day; a day
//! without any count is `None`.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use retail_ops_core::{ItemId, StockSnapshot};
use serde::{Deserialize, Serialize};

use crate::calendar::{DayWindow, DisplayTimezone};

/// The stock level of one item on one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayValue {
    /// The calendar day.
    pub date: NaiveDate,
    /// Latest counted quantity that day.
    pub quantity: Option<f64>,
}

/// Daily stock history for one inventory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowHistory {
    /// The inventory item.
    pub item_id: ItemId,
    /// One entry per window day, oldest first.
    pub days: Vec<DayValue>,
}

impl RowHistory {
    /// The most recent day that has a value.
    #[must_use]
    pub fn latest(&self) -> Option<f64> {
        self.days.iter().rev().find_map(|d| d.quantity)
    }
}

/// Build the daily history of each row in `item_ids`, in that order.
///
/// Snapshots for items not listed, or outside the window, are ignored. When
/// two counts share the same timestamp the later one in `snapshots` wins.
#[must_use]
pub fn daily_history_for_rows(
    snapshots: &[StockSnapshot],
    item_ids: &[ItemId],
    tz: DisplayTimezone,
    window: &DayWindow,
) -> Vec<RowHistory> {
    let wanted: HashMap<&ItemId, usize> = item_ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
    let mut latest: HashMap<(usize, NaiveDate), (NaiveDateTime, f64)> = HashMap::new();

    for snapshot in snapshots {
        let Some(&row) = wanted.get(&snapshot.item_id) else {
            continue;
        };
        let at = tz.local_datetime_of(&snapshot.recorded_at);
        let day = at.date();
        if !window.contains(day) {
            continue;
        }
        latest
            .entry((row, day))
            .and_modify(|current| {
                if at >= current.0 {
                    *current = (at, snapshot.quantity);
                }
            })
            .or_insert((at, snapshot.quantity));
    }

    item_ids
        .iter()
        .enumerate()
        .map(|(row, item_id)| RowHistory {
            item_id: item_id.clone(),
            days: window
                .days()
                .map(|date| DayValue {
                    date,
                    quantity: latest.get(&(row, date)).map(|(_, q)| *q),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use retail_ops_core::{parse_snapshots, SnapshotFieldMap};
    use serde_json::json;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn item(id: &str) -> ItemId {
        id.parse().unwrap()
    }

    #[test]
    fn latest_count_per_day() {
        let rows = vec![
            json!({"item_id": "a", "quantity": 10, "created_at": "2024-05-04T08:00:00Z"}),
            json!({"item_id": "a", "quantity": 7, "created_at": "2024-05-04T17:00:00Z"}),
            json!({"item_id": "a", "quantity": 3, "created_at": "2024-05-05T09:00:00Z"}),
            json!({"item_id": "b", "quantity": 1, "created_at": "2024-05-01T09:00:00Z"}),
            json!({"item_id": "z", "quantity": 99, "created_at": "2024-05-05T09:00:00Z"}),
        ];
        let snapshots = parse_snapshots(&rows, &SnapshotFieldMap::default());
        let window = DayWindow::ending_on(date(5), 5);
        let history = daily_history_for_rows(&snapshots, &[item("a"), item("b")], DisplayTimezone::UTC, &window);

        assert_eq!(history.len(), 2);
        let a: Vec<_> = history[0].days.iter().map(|d| d.quantity).collect();
        assert_eq!(a, vec![None, None, None, Some(7.0), Some(3.0)]);
        assert_eq!(history[0].latest(), Some(3.0));

        let b: Vec<_> = history[1].days.iter().map(|d| d.quantity).collect();
        assert_eq!(b, vec![Some(1.0), None, None, None, None]);
    }

    #[test]
    fn rows_without_data_still_span_window() {
        let window = DayWindow::ending_on(date(5), 5);
        let history = daily_history_for_rows(&[], &[item("a")], DisplayTimezone::UTC, &window);
        assert_eq!(history[0].days.len(), 5);
        assert_eq!(history[0].latest(), None);
        assert_eq!(history[0].days[0].date, date(1));
    }
}
