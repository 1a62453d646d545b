use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::domain::inventory::InventorySnapshot;
use crate::errors::ApplicationError;
use crate::ports::PropertyCache;

/// Normalized property name to that row's fields keyed by column name.
pub type PropertyIndex = BTreeMap<String, BTreeMap<String, String>>;

pub const PROPERTY_NOT_FOUND: &str = "Property not found.";

/// Trim, lowercase, and collapse whitespace runs into `_`.
pub fn normalize_property_key(name: &str) -> String {
    name.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join("_")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyLookup {
    Found(BTreeMap<String, String>),
    NotFound,
}

impl Serialize for PropertyLookup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Found(fields) => fields.serialize(serializer),
            Self::NotFound => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", PROPERTY_NOT_FOUND)?;
                map.end()
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexBuild {
    pub index: PropertyIndex,
    pub skipped_rows: usize,
}

/// Indexes every row by its name column. Earlier tables win on duplicate names.
pub fn build_property_index(snapshot: &InventorySnapshot, name_column: &str) -> IndexBuild {
    let wanted = normalize_property_key(name_column);
    let mut build = IndexBuild::default();

    for table in snapshot.tables.values() {
        for row in &table.rows {
            let fields = table.named_fields(row);
            let name = fields
                .iter()
                .find(|(column, _)| normalize_property_key(column) == wanted)
                .map(|(_, value)| normalize_property_key(value))
                .filter(|key| !key.is_empty());

            match name {
                Some(key) => {
                    build.index.entry(key).or_insert(fields);
                }
                None => {
                    warn!(
                        event_name = "inventory.cache.row_skipped",
                        table = %table.name,
                        row_id = %row.row_id,
                        "row has no property name; not cached"
                    );
                    build.skipped_rows += 1;
                }
            }
        }
    }

    build
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheRefresh {
    Written { entries: usize, skipped_rows: usize },
    /// Some table failed; the previous cache was left in place.
    Kept,
}

pub async fn refresh_cache<C>(
    cache: &C,
    snapshot: &InventorySnapshot,
    name_column: &str,
) -> Result<CacheRefresh, ApplicationError>
where
    C: PropertyCache + ?Sized,
{
    if !snapshot.is_complete() {
        warn!(
            event_name = "inventory.cache.kept",
            "inventory fetch was partial; keeping previous property cache"
        );
        return Ok(CacheRefresh::Kept);
    }

    let build = build_property_index(snapshot, name_column);
    cache.store(&build.index).await?;
    info!(
        event_name = "inventory.cache.written",
        entries = build.index.len(),
        skipped_rows = build.skipped_rows,
        "property cache written"
    );

    Ok(CacheRefresh::Written { entries: build.index.len(), skipped_rows: build.skipped_rows })
}

pub async fn lookup_property<C>(cache: &C, name: &str) -> Result<PropertyLookup, ApplicationError>
where
    C: PropertyCache + ?Sized,
{
    let index = cache.load().await?.ok_or_else(|| {
        ApplicationError::Persistence(
            "property cache is empty; run `leasedesk inventory` first".to_string(),
        )
    })?;

    Ok(match index.get(&normalize_property_key(name)) {
        Some(fields) => PropertyLookup::Found(fields.clone()),
        None => PropertyLookup::NotFound,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use tokio::sync::RwLock;

    use super::{
        build_property_index, lookup_property, normalize_property_key, refresh_cache,
        CacheRefresh, PropertyIndex, PropertyLookup,
    };
    use crate::domain::inventory::{
        ColumnSource, InventoryRow, InventorySnapshot, InventoryTable,
    };
    use crate::errors::{ApplicationError, TransportError};
    use crate::ports::PropertyCache;

    #[derive(Default)]
    struct MemoryCache {
        index: RwLock<Option<PropertyIndex>>,
    }

    #[async_trait]
    impl PropertyCache for MemoryCache {
        async fn store(&self, index: &PropertyIndex) -> Result<(), ApplicationError> {
            *self.index.write().await = Some(index.clone());
            Ok(())
        }

        async fn load(&self) -> Result<Option<PropertyIndex>, ApplicationError> {
            Ok(self.index.read().await.clone())
        }
    }

    fn table(name: &str, rows: Vec<InventoryRow>) -> InventoryTable {
        InventoryTable {
            name: name.to_owned(),
            table_id: format!("t-{name}"),
            total_rows: rows.len(),
            rows,
            columns: BTreeMap::from([
                ("c-name".to_owned(), "Property Name".to_owned()),
                ("c-rsf".to_owned(), "RSF".to_owned()),
            ]),
            column_source: ColumnSource::Api,
            error: None,
        }
    }

    fn row(id: &str, name: Option<&str>, rsf: u32) -> InventoryRow {
        let mut values = BTreeMap::from([("c-rsf".to_owned(), json!(rsf))]);
        if let Some(name) = name {
            values.insert("c-name".to_owned(), json!(name));
        }
        InventoryRow { row_id: id.to_owned(), values }
    }

    fn snapshot(tables: Vec<InventoryTable>) -> InventorySnapshot {
        InventorySnapshot {
            doc_id: "doc-1".to_owned(),
            fetched_at: Utc::now(),
            tables: tables.into_iter().map(|table| (table.name.clone(), table)).collect(),
        }
    }

    #[test]
    fn normalization_collapses_case_and_whitespace() {
        assert_eq!(normalize_property_key("  Downtown   Office "), "downtown_office");
        assert_eq!(normalize_property_key("downtown_office"), "downtown_office");
        assert_eq!(normalize_property_key("Harbor\tView"), "harbor_view");
    }

    #[test]
    fn index_uses_named_fields_and_skips_unnamed_rows() {
        let snapshot = snapshot(vec![table(
            "Available Inventory",
            vec![row("i-1", Some("Downtown Office"), 4200), row("i-2", None, 900)],
        )]);

        let build = build_property_index(&snapshot, "property_name");

        assert_eq!(build.skipped_rows, 1);
        let fields = build.index.get("downtown_office").expect("indexed");
        assert_eq!(fields.get("RSF").map(String::as_str), Some("4200"));
        assert_eq!(fields.get("Property Name").map(String::as_str), Some("Downtown Office"));
    }

    #[tokio::test]
    async fn differently_written_names_resolve_to_same_record() {
        let cache = MemoryCache::default();
        let snapshot = snapshot(vec![table(
            "Available Inventory",
            vec![row("i-1", Some("Downtown Office"), 4200)],
        )]);
        refresh_cache(&cache, &snapshot, "property_name").await.expect("cache refreshed");

        let first = lookup_property(&cache, "Downtown Office").await.expect("lookup");
        let second = lookup_property(&cache, "downtown_office").await.expect("lookup");

        assert!(matches!(first, PropertyLookup::Found(_)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_name_returns_not_found_sentinel() {
        let cache = MemoryCache::default();
        cache.store(&PropertyIndex::new()).await.expect("store");

        let lookup = lookup_property(&cache, "Nowhere Plaza").await.expect("lookup");

        assert_eq!(lookup, PropertyLookup::NotFound);
        assert_eq!(
            serde_json::to_value(&lookup).expect("serializes"),
            json!({"error": "Property not found."})
        );
    }

    #[tokio::test]
    async fn partial_snapshot_keeps_previous_cache() {
        let cache = MemoryCache::default();
        let previous = PropertyIndex::from([("old".to_owned(), BTreeMap::new())]);
        cache.store(&previous).await.expect("store");

        let mut failed = table("Unavailable Inventory", Vec::new());
        failed.error = Some(TransportError::status(500, "boom"));
        let snapshot = snapshot(vec![
            table("Available Inventory", vec![row("i-1", Some("New Place"), 1000)]),
            failed,
        ]);

        let outcome = refresh_cache(&cache, &snapshot, "property_name").await.expect("refresh");

        assert_eq!(outcome, CacheRefresh::Kept);
        assert_eq!(cache.load().await.expect("load"), Some(previous));
    }

    #[tokio::test]
    async fn lookup_without_cache_is_a_persistence_error() {
        let cache = MemoryCache::default();

        let error = lookup_property(&cache, "anything").await.expect_err("no cache yet");

        assert_eq!(error.error_class(), "persistence");
    }
}
