use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::{CodaConfig, ConfigError, TableRef};
use crate::domain::inventory::{InventorySnapshot, InventoryTable};
use crate::inventory::{flatten_row, resolve_columns};
use crate::ports::TabularStore;

pub struct InventoryReader<S> {
    store: S,
    doc_id: String,
    tables: Vec<TableRef>,
    column_fallback: BTreeMap<String, String>,
}

impl<S: TabularStore> InventoryReader<S> {
    pub fn new(
        store: S,
        doc_id: impl Into<String>,
        tables: Vec<TableRef>,
        column_fallback: BTreeMap<String, String>,
    ) -> Self {
        Self { store, doc_id: doc_id.into(), tables, column_fallback }
    }

    /// Fails on missing credentials or identifiers, before any request is made.
    pub fn from_config(store: S, config: &CodaConfig) -> Result<Self, ConfigError> {
        config.ensure_ready()?;
        Ok(Self::new(store, config.doc_id.clone(), config.tables(), config.column_fallback.clone()))
    }

    /// Reads every configured table. A failing table is recorded and the rest continue.
    pub async fn read(&self) -> InventorySnapshot {
        let mut tables = BTreeMap::new();
        for table in &self.tables {
            let report = self.read_table(table).await;
            tables.insert(table.name.clone(), report);
        }

        InventorySnapshot { doc_id: self.doc_id.clone(), fetched_at: Utc::now(), tables }
    }

    async fn read_table(&self, table: &TableRef) -> InventoryTable {
        let rows = match self.store.fetch_rows(&self.doc_id, &table.id).await {
            Ok(rows) => rows,
            Err(error) => {
                warn!(
                    event_name = "inventory.table.fetch_failed",
                    table = %table.name,
                    status = ?error.status,
                    "inventory table fetch failed"
                );
                return InventoryTable::failed(&table.name, &table.id, error);
            }
        };

        let fetched_columns = self.store.fetch_columns(&self.doc_id, &table.id).await;
        if let Err(error) = &fetched_columns {
            warn!(
                event_name = "inventory.columns.fetch_failed",
                table = %table.name,
                status = ?error.status,
                "column metadata unavailable; using fallback mapping"
            );
        }
        let (columns, column_source) = resolve_columns(fetched_columns, &self.column_fallback);

        let rows: Vec<_> = rows.iter().map(flatten_row).collect();
        info!(
            event_name = "inventory.table.fetched",
            table = %table.name,
            rows = rows.len(),
            columns = columns.len(),
            column_source = ?column_source,
            "inventory table fetched"
        );

        InventoryTable {
            name: table.name.clone(),
            table_id: table.id.clone(),
            total_rows: rows.len(),
            rows,
            columns,
            column_source,
            error: None,
        }
    }
}
