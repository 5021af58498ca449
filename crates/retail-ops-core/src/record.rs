//! Operational records as consumed by the aggregation layer.
//!
//! Every operational table (checklist tasks, maintenance job logs,
//! deep-cleaning entries, event orders) is read as flat JSON rows. A
//! [`FieldMap`] names the columns that matter, and [`parse_record`] turns a
//! row into either a [`Record`] or an explicit skip.
//!
//! Rows missing their store key or date are excluded from aggregation rather
//! than failing it. The exclusion is visible as [`ParsedRecord::Skipped`] and
//! is tallied in [`ParseReport`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{RecordId, StoreId};
use crate::status::TaskStatus;

/// A point in time as stored by the backend.
///
/// Date columns come back as plain dates, `timestamptz` columns with an
/// offset, and `timestamp` columns without one. The variants keep that
/// distinction so the calendar day can be derived under a single timezone
/// policy later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordTime {
    /// A calendar date with no time component.
    Date(NaiveDate),
    /// An absolute instant.
    Instant(DateTime<Utc>),
    /// A wall-clock time with no offset.
    Local(NaiveDateTime),
}

impl RecordTime {
    /// Parse the textual forms the backend emits.
    ///
    /// Returns `None` if the input matches none of them.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::Instant(instant.with_timezone(&Utc)));
        }
        // Postgres text output: "2024-05-01 10:00:00.123+00"
        for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
            if let Ok(instant) = DateTime::parse_from_str(raw, format) {
                return Some(Self::Instant(instant.with_timezone(&Utc)));
            }
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(local) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Self::Local(local));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Self::Date)
    }
}

impl fmt::Display for RecordTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::Instant(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Local(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl std::str::FromStr for RecordTime {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::CoreError::InvalidDate(s.to_string()))
    }
}

/// A validated operational record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Row identifier, when the row carries one.
    pub id: Option<RecordId>,
    /// Store the record belongs to.
    pub store_id: StoreId,
    /// When the record happened (or is scheduled for).
    pub occurred_at: RecordTime,
    /// Normalized status; `None` when the raw value was null or unrecognized.
    pub status: Option<TaskStatus>,
}

/// Column names used to read a [`Record`] out of a JSON row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    /// Primary key column.
    #[serde(default = "FieldMap::default_id")]
    pub id: String,
    /// Store foreign key column.
    #[serde(default = "FieldMap::default_store")]
    pub store: String,
    /// Date or timestamp column used for day bucketing.
    #[serde(default = "FieldMap::default_date")]
    pub date: String,
    /// Status column.
    #[serde(default = "FieldMap::default_status")]
    pub status: String,
}

impl FieldMap {
    fn default_id() -> String {
        "id".to_string()
    }

    fn default_store() -> String {
        "store_id".to_string()
    }

    fn default_date() -> String {
        "created_at".to_string()
    }

    fn default_status() -> String {
        "status".to_string()
    }

    /// Use a different date column, keeping the other defaults.
    #[must_use]
    pub fn with_date(mut self, column: impl Into<String>) -> Self {
        self.date = column.into();
        self
    }

    /// Use a different store column, keeping the other defaults.
    #[must_use]
    pub fn with_store(mut self, column: impl Into<String>) -> Self {
        self.store = column.into();
        self
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: Self::default_id(),
            store: Self::default_store(),
            date: Self::default_date(),
            status: Self::default_status(),
        }
    }
}

/// Why a row was left out of aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The row was not a JSON object.
    NotAnObject,
    /// The store key was missing or blank.
    MissingStore,
    /// The date column was missing or null.
    MissingDate,
    /// The date column held something unparseable.
    InvalidDate(String),
}

impl SkipReason {
    /// A stable label for tallying skips.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::MissingStore => "missing_store",
            Self::MissingDate => "missing_date",
            Self::InvalidDate(_) => "invalid_date",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDate(raw) => write!(f, "invalid_date({raw})"),
            other => f.write_str(other.kind()),
        }
    }
}

/// Outcome of parsing one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRecord {
    /// The row produced a usable record.
    Valid(Record),
    /// The row was excluded.
    Skipped(SkipReason),
}

impl ParsedRecord {
    /// Return the record if the row was valid.
    #[must_use]
    pub fn into_valid(self) -> Option<Record> {
        match self {
            Self::Valid(record) => Some(record),
            Self::Skipped(_) => None,
        }
    }
}

/// Read a time column, distinguishing a missing value from an unparseable one.
pub(crate) fn time_field(
    row: &serde_json::Map<String, Value>,
    column: &str,
) -> Result<RecordTime, SkipReason> {
    match row.get(column) {
        None | Some(Value::Null) => Err(SkipReason::MissingDate),
        Some(Value::String(s)) if s.trim().is_empty() => Err(SkipReason::MissingDate),
        Some(Value::String(s)) => {
            RecordTime::parse(s).ok_or_else(|| SkipReason::InvalidDate(s.clone()))
        }
        Some(other) => Err(SkipReason::InvalidDate(other.to_string())),
    }
}

/// Parse one JSON row into a record.
///
/// Never fails: unusable rows come back as [`ParsedRecord::Skipped`].
#[must_use]
pub fn parse_record(row: &Value, fields: &FieldMap) -> ParsedRecord {
    let Some(object) = row.as_object() else {
        return ParsedRecord::Skipped(SkipReason::NotAnObject);
    };

    let id = object.get(&fields.id).and_then(RecordId::from_value);
    let Some(store_id) = object.get(&fields.store).and_then(StoreId::from_value) else {
        return ParsedRecord::Skipped(SkipReason::MissingStore);
    };
    let occurred_at = match time_field(object, &fields.date) {
        Ok(time) => time,
        Err(reason) => return ParsedRecord::Skipped(reason),
    };

    let status = match object.get(&fields.status) {
        Some(Value::String(raw)) => {
            let status = TaskStatus::parse_loose(raw);
            if status.is_none() {
                tracing::trace!(record_id = ?id, raw = %raw, "Unrecognized status");
            }
            status
        }
        _ => None,
    };

    ParsedRecord::Valid(Record {
        id,
        store_id,
        occurred_at,
        status,
    })
}

/// Valid records from a batch of rows, plus a tally of what was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Records that passed validation, in input order.
    pub records: Vec<Record>,
    /// Number of skipped rows per [`SkipReason::kind`].
    pub skipped: BTreeMap<&'static str, usize>,
    /// Valid records that carried no id. They aggregate like any other.
    pub without_id: usize,
}

impl ParseReport {
    /// Total number of skipped rows.
    #[must_use]
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Parse a batch of rows, logging and tallying the skipped ones.
#[must_use]
pub fn parse_rows(rows: &[Value], fields: &FieldMap) -> ParseReport {
    let mut report = ParseReport::default();

    for row in rows {
        match parse_record(row, fields) {
            ParsedRecord::Valid(record) => {
                if record.id.is_none() {
                    report.without_id += 1;
                }
                report.records.push(record);
            }
            ParsedRecord::Skipped(reason) => {
                tracing::debug!(reason = %reason, "Skipping row");
                *report.skipped.entry(reason.kind()).or_insert(0) += 1;
            }
        }
    }

    if report.skipped_total() > 0 {
        tracing::debug!(
            valid = report.records.len(),
            skipped = report.skipped_total(),
            "Parsed rows with exclusions"
        );
    }

    report
}

/// A store, used to label aggregated rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoreRow")]
pub struct Store {
    /// Store identifier.
    pub id: StoreId,
    /// Human-readable store name.
    pub name: String,
}

/// A store as the backend returns it. Tables name the column `name` or
/// `store_name`, and some carry both.
#[derive(Deserialize)]
struct StoreRow {
    id: StoreId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    store_name: Option<String>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        let name = [row.name, row.store_name]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .unwrap_or_default();
        Self { id: row.id, name }
    }
}

impl Store {
    /// Create a store entry.
    #[must_use]
    pub fn new(id: StoreId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The display label, falling back to the raw key when the name is blank.
    #[must_use]
    pub fn label(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.id.as_str()
        } else {
            name
        }
    }
}
