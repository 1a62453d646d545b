pub mod cache;
pub mod reader;
pub mod render;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::inventory::{ColumnInfo, ColumnSource, InventoryRow, RawRow};
use crate::errors::TransportError;

pub use cache::{normalize_property_key, PropertyIndex, PropertyLookup};
pub use reader::InventoryReader;
pub use render::render_snapshot;

/// Unwraps a rich cell to `displayValue`, then `value`, then the object's text.
pub fn flatten_cell(cell: &Value) -> Value {
    match cell {
        Value::Object(map) => map
            .get("displayValue")
            .or_else(|| map.get("value"))
            .cloned()
            .unwrap_or_else(|| Value::String(cell.to_string())),
        other => other.clone(),
    }
}

pub fn flatten_row(row: &RawRow) -> InventoryRow {
    InventoryRow {
        row_id: row.id.clone(),
        values: row
            .values
            .iter()
            .map(|(column_id, cell)| (column_id.clone(), flatten_cell(cell)))
            .collect(),
    }
}

/// Column mapping from the API when it answered, else the configured fallback.
pub fn resolve_columns(
    fetched: Result<Vec<ColumnInfo>, TransportError>,
    fallback: &BTreeMap<String, String>,
) -> (BTreeMap<String, String>, ColumnSource) {
    match fetched {
        Ok(columns) => (
            columns.into_iter().map(|column| (column.id, column.name)).collect(),
            ColumnSource::Api,
        ),
        Err(_) if !fallback.is_empty() => (fallback.clone(), ColumnSource::Fallback),
        Err(_) => (BTreeMap::new(), ColumnSource::None),
    }
}
