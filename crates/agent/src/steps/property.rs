use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::warn;

use leasedesk_core::domain::lead::PropertyMatch;
use leasedesk_core::inventory::cache::refresh_cache;
use leasedesk_core::inventory::InventoryReader;
use leasedesk_core::ports::{PropertyCache, TabularStore};

use crate::conversation::PropertyMatcher;
use crate::steps::{PipelineContext, PipelineStep};

/// Reads current inventory, refreshes the property cache, and picks candidate rows.
pub struct PropertyLookupStep<T, C> {
    reader: InventoryReader<T>,
    cache: C,
    name_column: String,
    matcher: PropertyMatcher,
}

impl<T: TabularStore, C: PropertyCache> PropertyLookupStep<T, C> {
    pub fn new(reader: InventoryReader<T>, cache: C, name_column: impl Into<String>) -> Self {
        Self { reader, cache, name_column: name_column.into(), matcher: PropertyMatcher::new() }
    }
}

fn describe_match(candidate: &PropertyMatch) -> String {
    let fields = candidate
        .fields
        .iter()
        .map(|(name, value)| format!("  {name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{} (score {})\n{fields}", candidate.row_id, candidate.score)
}

#[async_trait]
impl<T: TabularStore, C: PropertyCache> PipelineStep for PropertyLookupStep<T, C> {
    fn name(&self) -> &'static str {
        "property_lookup"
    }

    async fn run(&self, context: &mut PipelineContext) -> Result<String> {
        let requirements = context
            .intake
            .as_ref()
            .map(|intake| intake.requirements.clone())
            .ok_or_else(|| anyhow!("property lookup needs a lead intake"))?;

        let snapshot = self.reader.read().await;
        if let Err(error) = refresh_cache(&self.cache, &snapshot, &self.name_column).await {
            warn!(
                event_name = "pipeline.property.cache_failed",
                run_id = %context.run_id,
                error = %error,
                "property cache not updated"
            );
        }

        let failed: Vec<String> = snapshot
            .tables
            .values()
            .filter_map(|table| table.error.as_ref().map(|error| format!("{}: {error}", table.name)))
            .collect();
        let matches = self.matcher.best_matches(&snapshot, &requirements);

        let mut output = if matches.is_empty() {
            "No matching availability found.".to_string()
        } else {
            matches.iter().map(describe_match).collect::<Vec<_>>().join("\n\n")
        };
        if !failed.is_empty() {
            output.push_str(&format!("\n\nUnreadable tables: {}", failed.join("; ")));
        }

        context.snapshot = Some(snapshot);
        context.matches = matches;
        Ok(output)
    }
}
