//! Derived metrics: status counts, completion percentage, and classification.

use std::fmt;

use retail_ops_core::TaskStatus;
use serde::{Deserialize, Serialize};

/// Running per-status tallies for one bucket.
///
/// `pending + in_progress + completed + unknown == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Records in the bucket.
    pub total: usize,
    /// Records with a completed status.
    pub completed: usize,
    /// Records with a pending status.
    pub pending: usize,
    /// Records with an in-progress status.
    pub in_progress: usize,
    /// Records whose status was null or unrecognized.
    pub unknown: usize,
}

impl StatusCounts {
    /// Count one record.
    pub fn record(&mut self, status: Option<TaskStatus>) {
        self.total += 1;
        match status {
            Some(TaskStatus::Completed) => self.completed += 1,
            Some(TaskStatus::Pending) => self.pending += 1,
            Some(TaskStatus::InProgress) => self.in_progress += 1,
            None => self.unknown += 1,
        }
    }

    /// Completion percentage of this bucket.
    #[must_use]
    pub fn percent(&self) -> u8 {
        percent_complete(self.completed, self.total)
    }

    /// Classification of this bucket.
    #[must_use]
    pub fn classify(&self) -> CompletionStatus {
        CompletionStatus::classify(self.completed, self.total)
    }
}

/// Percentage of completed records, rounded half up.
///
/// Returns `0` for an empty bucket and never exceeds `100`, even when the
/// counts are inconsistent.
#[must_use]
pub fn percent_complete(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    let rounded = (completed * 200 + total) / (total * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Three-way completion classification shown on every status summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionStatus {
    /// Nothing was recorded.
    #[serde(rename = "No Entry")]
    NoEntry,
    /// Every recorded item is completed.
    #[serde(rename = "All Done")]
    AllDone,
    /// At least one recorded item is not completed.
    #[serde(rename = "Incomplete")]
    Incomplete,
}

impl CompletionStatus {
    /// Classify a bucket. An empty bucket is `NoEntry` regardless of `completed`.
    #[must_use]
    pub const fn classify(completed: usize, total: usize) -> Self {
        if total == 0 {
            Self::NoEntry
        } else if completed == total {
            Self::AllDone
        } else {
            Self::Incomplete
        }
    }

    /// The display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoEntry => "No Entry",
            Self::AllDone => "All Done",
            Self::Incomplete => "Incomplete",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
