//! Task status normalization.
//!
//! Operational tables store status as free text, and the live data carries
//! several spellings of the same state (`in_progress`, `in progress`, ...).
//! Everything is normalized here, once, at the boundary.
//!
//! Accepted spellings (case-insensitive, surrounding whitespace ignored, with
//! `_`, `-` and space treated as the same separator):
//!
//! | Status       | Raw forms                                            |
//! |--------------|------------------------------------------------------|
//! | `Pending`    | `pending`                                            |
//! | `InProgress` | `in_progress`, `in progress`, `in-progress`, `inprogress` |
//! | `Completed`  | `completed`, `complete`                              |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The lifecycle status of a task-like record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    Pending,
    /// Started but not finished.
    InProgress,
    /// Finished.
    Completed,
}

impl TaskStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// Normalize a raw status string.
    ///
    /// Returns `None` for unrecognized spellings; callers treat that as an
    /// unknown status rather than an error.
    #[must_use]
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let folded: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '_' | '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match folded.as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" | "inprogress" => Some(Self::InProgress),
            "completed" | "complete" => Some(Self::Completed),
            _ => None,
        }
    }

    /// The canonical wire form, as written back to the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Returns true for the completed state.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_loose(s).ok_or_else(|| crate::CoreError::UnknownStatus(s.to_string()))
    }
}
