//! Calendar-day policy.
//!
//! Every function that turns a [`RecordTime`] into a calendar day takes a
//! [`DisplayTimezone`]. Instants are converted into that zone before the time
//! of day is dropped; offset-less timestamps are read as wall time already in
//! that zone; plain dates pass through. All records in one aggregation pass
//! go through the same zone, so a day boundary cannot move between them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use retail_ops_core::RecordTime;
use serde::{Deserialize, Serialize};

use crate::error::AggregateError;

/// The timezone calendar days are computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayTimezone(Tz);

impl DisplayTimezone {
    /// Coordinated Universal Time.
    pub const UTC: Self = Self(Tz::UTC);

    /// Wrap a `chrono_tz` zone.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Return the underlying zone.
    #[must_use]
    pub const fn tz(&self) -> Tz {
        self.0
    }

    /// The wall-clock time of a record in this zone.
    ///
    /// Plain dates map to midnight.
    #[must_use]
    pub fn local_datetime_of(&self, time: &RecordTime) -> NaiveDateTime {
        match time {
            RecordTime::Instant(instant) => instant.with_timezone(&self.0).naive_local(),
            RecordTime::Local(local) => *local,
            RecordTime::Date(date) => date.and_time(chrono::NaiveTime::MIN),
        }
    }

    /// The calendar day a record falls on in this zone.
    #[must_use]
    pub fn day_of(&self, time: &RecordTime) -> NaiveDate {
        self.local_datetime_of(time).date()
    }

    /// The current calendar day in this zone.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.0).date_naive()
    }
}

impl Default for DisplayTimezone {
    fn default() -> Self {
        Self::UTC
    }
}

impl fmt::Display for DisplayTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

impl FromStr for DisplayTimezone {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| AggregateError::UnknownTimezone(s.to_string()))
    }
}

impl TryFrom<String> for DisplayTimezone {
    type Error = AggregateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DisplayTimezone> for String {
    fn from(tz: DisplayTimezone) -> Self {
        tz.0.name().to_string()
    }
}

/// An inclusive run of calendar days ending on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayWindow {
    end: NaiveDate,
    days: u32,
}

impl DayWindow {
    /// A window of `days` days whose last day is `end`.
    #[must_use]
    pub const fn ending_on(end: NaiveDate, days: u32) -> Self {
        Self { end, days }
    }

    /// A window of `days` days ending on today's date in `tz`.
    #[must_use]
    pub fn ending_today(tz: DisplayTimezone, now: DateTime<Utc>, days: u32) -> Self {
        Self::ending_on(tz.today(now), days)
    }

    /// The last day of the window.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// The first day of the window, or `None` for an empty window.
    #[must_use]
    pub fn start(&self) -> Option<NaiveDate> {
        let span = self.days.checked_sub(1)?;
        Some(
            self.end
                .checked_sub_days(Days::new(u64::from(span)))
                .unwrap_or(NaiveDate::MIN),
        )
    }

    /// Number of days in the window.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.days
    }

    /// Returns true for a zero-length window.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.days == 0
    }

    /// Returns true if `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start().is_some_and(|start| start <= date && date <= self.end)
    }

    /// The days of the window, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start();
        let end = self.end;
        (0..self.days).filter_map(move |offset| {
            start
                .and_then(|s| s.checked_add_days(Days::new(u64::from(offset))))
                .filter(|day| *day <= end)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn instant_day_depends_on_zone() {
        // 02:30 UTC on May 2nd is still May 1st in New York.
        let instant = RecordTime::Instant(Utc.with_ymd_and_hms(2024, 5, 2, 2, 30, 0).unwrap());

        assert_eq!(DisplayTimezone::UTC.day_of(&instant), date(2024, 5, 2));
        let ny: DisplayTimezone = "America/New_York".parse().unwrap();
        assert_eq!(ny.day_of(&instant), date(2024, 5, 1));
    }

    #[test]
    fn local_and_date_values_ignore_zone() {
        let ny: DisplayTimezone = "America/New_York".parse().unwrap();
        let local = RecordTime::Local(date(2024, 5, 1).and_hms_opt(23, 59, 0).unwrap());
        assert_eq!(ny.day_of(&local), date(2024, 5, 1));
        assert_eq!(ny.day_of(&RecordTime::Date(date(2024, 5, 1))), date(2024, 5, 1));
    }

    #[test]
    fn today_in_zone() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        let la: DisplayTimezone = "America/Los_Angeles".parse().unwrap();
        assert_eq!(la.today(now), date(2023, 12, 31));
        assert_eq!(DisplayTimezone::UTC.today(now), date(2024, 1, 1));
    }

    #[test]
    fn unknown_zone_rejected() {
        assert!("Mars/Olympus_Mons".parse::<DisplayTimezone>().is_err());
        let tz: DisplayTimezone = serde_json::from_str("\"Europe/Berlin\"").unwrap();
        assert_eq!(tz.to_string(), "Europe/Berlin");
    }

    #[test]
    fn window_days_oldest_first() {
        let window = DayWindow::ending_on(date(2024, 3, 2), 3);
        let days: Vec<_> = window.days().collect();
        assert_eq!(days, vec![date(2024, 2, 29), date(2024, 3, 1), date(2024, 3, 2)]);
        assert_eq!(window.start(), Some(date(2024, 2, 29)));
        assert!(window.contains(date(2024, 3, 1)));
        assert!(!window.contains(date(2024, 2, 28)));
        assert!(!window.contains(date(2024, 3, 3)));
    }

    #[test]
    fn empty_window() {
        let window = DayWindow::ending_on(date(2024, 3, 2), 0);
        assert!(window.is_empty());
        assert_eq!(window.start(), None);
        assert_eq!(window.days().count(), 0);
        assert!(!window.contains(date(2024, 3, 2)));
    }

    #[test]
    fn window_ending_today() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let window = DayWindow::ending_today(DisplayTimezone::UTC, now, 7);
        assert_eq!(window.end(), date(2024, 6, 10));
        assert_eq!(window.days().count(), 7);
    }
}
