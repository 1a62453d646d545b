use std::fmt::Write as _;

use crate::domain::inventory::{value_text, InventorySnapshot};

const MAX_VALUE_CHARS: usize = 100;

fn truncate_value(text: &str) -> String {
    if text.chars().count() <= MAX_VALUE_CHARS {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_VALUE_CHARS - 3).collect();
    format!("{kept}...")
}

/// Human-readable listing of a snapshot with column ids resolved to names.
pub fn render_snapshot(snapshot: &InventorySnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Inventory for doc {} (fetched {})",
        snapshot.doc_id,
        snapshot.fetched_at.to_rfc3339()
    );

    for table in snapshot.tables.values() {
        let _ = writeln!(out);
        let _ = writeln!(out, "== {} ({}) ==", table.name, table.table_id);

        if let Some(error) = &table.error {
            let _ = writeln!(out, "  error: {error}");
            continue;
        }

        let _ = writeln!(out, "  {} rows, columns from {:?}", table.total_rows, table.column_source);
        for (index, row) in table.rows.iter().enumerate() {
            let _ = writeln!(out, "--- Row {} (ID: {}) ---", index + 1, row.row_id);
            if row.values.is_empty() {
                let _ = writeln!(out, "  (no values)");
            }
            for (column_id, value) in &row.values {
                let _ = writeln!(
                    out,
                    "  {}: {}",
                    table.column_name(column_id),
                    truncate_value(&value_text(value))
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use serde_json::json;

    use super::{render_snapshot, truncate_value};
    use crate::domain::inventory::{
        ColumnSource, InventoryRow, InventorySnapshot, InventoryTable,
    };
    use crate::errors::TransportError;

    #[test]
    fn long_values_are_cut_to_one_hundred_chars() {
        let long = "x".repeat(150);

        let truncated = truncate_value(&long);

        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_value("short"), "short");
    }

    #[test]
    fn rendering_resolves_names_and_reports_errors() {
        let available = InventoryTable {
            name: "Available Inventory".to_owned(),
            table_id: "t-1".to_owned(),
            total_rows: 1,
            rows: vec![InventoryRow {
                row_id: "i-1".to_owned(),
                values: BTreeMap::from([
                    ("c-addr".to_owned(), json!("100 Main St")),
                    ("c-unknown".to_owned(), json!(7)),
                ]),
            }],
            columns: BTreeMap::from([("c-addr".to_owned(), "Address".to_owned())]),
            column_source: ColumnSource::Api,
            error: None,
        };
        let failed = InventoryTable::failed(
            "Unavailable Inventory",
            "t-2",
            TransportError::status(401, "unauthorized"),
        );
        let snapshot = InventorySnapshot {
            doc_id: "doc-1".to_owned(),
            fetched_at: Utc::now(),
            tables: BTreeMap::from([
                (available.name.clone(), available),
                (failed.name.clone(), failed),
            ]),
        };

        let text = render_snapshot(&snapshot);

        assert!(text.contains("Address: 100 Main St"));
        assert!(text.contains("c-unknown: 7"));
        assert!(text.contains("--- Row 1 (ID: i-1) ---"));
        assert!(text.contains("error: request failed with status 401: unauthorized"));
    }
}
