//! Core types for retail-ops.
//!
//! This crate provides the data model shared by the dashboard layers:
//!
//! - **Identifiers**: opaque keys for stores, records, and inventory items
//! - **Status**: the [`TaskStatus`] enum and the one place raw status text is normalized
//! - **Records**: row parsing into [`ParsedRecord::Valid`] or [`ParsedRecord::Skipped`]
//! - **Snapshots**: stock counts used for inventory history
//!
//! # Example
//!
//! ```
//! use retail_ops_core::{parse_record, FieldMap, ParsedRecord, TaskStatus};
//!
//! let row = serde_json::json!({
//!     "id": 10,
//!     "store_id": 1,
//!     "created_at": "2024-05-01T09:30:00Z",
//!     "status": "in progress",
//! });
//!
//! match parse_record(&row, &FieldMap::default()) {
//!     ParsedRecord::Valid(record) => assert_eq!(record.status, Some(TaskStatus::InProgress)),
//!     ParsedRecord::Skipped(reason) => panic!("unexpected skip: {reason}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod record;
pub mod snapshot;
pub mod status;

pub use error::{CoreError, Result};
pub use ids::{IdError, ItemId, RecordId, StoreId};
pub use record::{
    parse_record, parse_rows, FieldMap, ParseReport, ParsedRecord, Record, RecordTime, SkipReason,
    Store,
};
pub use snapshot::{parse_snapshot, parse_snapshots, SnapshotFieldMap, SnapshotSkip, StockSnapshot};
pub use status::TaskStatus;
