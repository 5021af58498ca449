//! Stock-level snapshots for inventory history.
//!
//! The stock history table records a quantity per item each time a count is
//! taken. Parsing follows the same skip policy as [`crate::record`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ItemId, StoreId};
use crate::record::{time_field, RecordTime, SkipReason};

/// One stock count for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    /// Inventory item the count belongs to.
    pub item_id: ItemId,
    /// Store holding the stock, when the table records it.
    pub store_id: Option<StoreId>,
    /// Counted quantity.
    pub quantity: f64,
    /// When the count was taken.
    pub recorded_at: RecordTime,
}

/// Column names used to read a [`StockSnapshot`] out of a JSON row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFieldMap {
    /// Item key column.
    #[serde(default = "SnapshotFieldMap::default_item")]
    pub item: String,
    /// Store key column.
    #[serde(default = "SnapshotFieldMap::default_store")]
    pub store: String,
    /// Quantity column.
    #[serde(default = "SnapshotFieldMap::default_quantity")]
    pub quantity: String,
    /// Timestamp column.
    #[serde(default = "SnapshotFieldMap::default_date")]
    pub date: String,
}

impl SnapshotFieldMap {
    fn default_item() -> String {
        "item_id".to_string()
    }

    fn default_store() -> String {
        "store_id".to_string()
    }

    fn default_quantity() -> String {
        "quantity".to_string()
    }

    fn default_date() -> String {
        "created_at".to_string()
    }
}

impl Default for SnapshotFieldMap {
    fn default() -> Self {
        Self {
            item: Self::default_item(),
            store: Self::default_store(),
            quantity: Self::default_quantity(),
            date: Self::default_date(),
        }
    }
}

/// Why a snapshot row was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSkip {
    /// The item key was missing.
    MissingItem,
    /// The quantity was missing or not numeric.
    InvalidQuantity,
    /// The row failed one of the shared record checks.
    Record(SkipReason),
}

/// Parse one stock history row.
///
/// Quantities stored as numeric strings (Postgres `numeric` comes back as
/// text) are accepted.
///
/// # Errors
///
/// Returns the reason the row cannot be used.
pub fn parse_snapshot(row: &Value, fields: &SnapshotFieldMap) -> Result<StockSnapshot, SnapshotSkip> {
    let object = row
        .as_object()
        .ok_or(SnapshotSkip::Record(SkipReason::NotAnObject))?;

    let item_id = object
        .get(&fields.item)
        .and_then(ItemId::from_value)
        .ok_or(SnapshotSkip::MissingItem)?;

    let quantity = match object.get(&fields.quantity) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|q| q.is_finite())
    .ok_or(SnapshotSkip::InvalidQuantity)?;

    let recorded_at = time_field(object, &fields.date).map_err(SnapshotSkip::Record)?;
    let store_id = object.get(&fields.store).and_then(StoreId::from_value);

    Ok(StockSnapshot {
        item_id,
        store_id,
        quantity,
        recorded_at,
    })
}

/// Parse a batch of stock rows, dropping the unusable ones.
#[must_use]
pub fn parse_snapshots(rows: &[Value], fields: &SnapshotFieldMap) -> Vec<StockSnapshot> {
    rows.iter()
        .filter_map(|row| match parse_snapshot(row, fields) {
            Ok(snapshot) => Some(snapshot),
            Err(reason) => {
                tracing::debug!(reason = ?reason, "Skipping stock row");
                None
            }
        })
        .collect()
}
