use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::TransportError;

/// A row exactly as the tabular store returns it, cells still raw JSON values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub id: String,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub row_id: String,
    pub values: BTreeMap<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    Api,
    Fallback,
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryTable {
    pub name: String,
    pub table_id: String,
    pub total_rows: usize,
    pub rows: Vec<InventoryRow>,
    pub columns: BTreeMap<String, String>,
    pub column_source: ColumnSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TransportError>,
}

impl InventoryTable {
    pub fn failed(name: &str, table_id: &str, error: TransportError) -> Self {
        Self {
            name: name.to_string(),
            table_id: table_id.to_string(),
            total_rows: 0,
            rows: Vec::new(),
            columns: BTreeMap::new(),
            column_source: ColumnSource::None,
            error: Some(error),
        }
    }

    pub fn column_name<'a>(&'a self, column_id: &'a str) -> &'a str {
        self.columns.get(column_id).map(String::as_str).unwrap_or(column_id)
    }

    /// Row values keyed by resolved column name, rendered as text.
    pub fn named_fields(&self, row: &InventoryRow) -> BTreeMap<String, String> {
        row.values
            .iter()
            .map(|(column_id, value)| (self.column_name(column_id).to_string(), value_text(value)))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub doc_id: String,
    pub fetched_at: DateTime<Utc>,
    pub tables: BTreeMap<String, InventoryTable>,
}

impl InventorySnapshot {
    pub fn table(&self, name: &str) -> Option<&InventoryTable> {
        self.tables.get(name)
    }

    pub fn is_complete(&self) -> bool {
        self.tables.values().all(|table| table.error.is_none())
    }
}

/// Plain text form of a flattened cell value.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
