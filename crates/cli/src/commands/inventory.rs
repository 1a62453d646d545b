use leasedesk_connectors::coda::CodaClient;
use leasedesk_core::config::AppConfig;
use leasedesk_core::inventory::cache::{refresh_cache, CacheRefresh};
use leasedesk_core::inventory::{render_snapshot, InventoryReader};
use leasedesk_store::JsonPropertyCache;
use tracing::info;

use crate::commands::{block_on, CommandResult};

const COMMAND: &str = "inventory";

/// Reads both inventory tables, prints them, and rewrites the property cache.
pub fn run(config: &AppConfig) -> CommandResult {
    let client = match CodaClient::from_config(&config.coda) {
        Ok(client) => client,
        Err(error) => return CommandResult::from_config_error(COMMAND, error),
    };
    let reader = match InventoryReader::from_config(client, &config.coda) {
        Ok(reader) => reader,
        Err(error) => return CommandResult::from_config_error(COMMAND, error),
    };
    let cache = JsonPropertyCache::new(&config.cache.path);

    block_on(COMMAND, async {
        let snapshot = reader.read().await;
        let mut output = render_snapshot(&snapshot);

        match refresh_cache(&cache, &snapshot, &config.cache.name_column).await {
            Ok(CacheRefresh::Written { entries, .. }) => {
                info!(
                    event_name = "cli.inventory.cache_written",
                    entries,
                    path = %config.cache.path.display(),
                    "property cache refreshed"
                );
            }
            Ok(CacheRefresh::Kept) => {
                output.push_str("\nProperty cache not updated: one or more tables failed.\n");
            }
            Err(error) => return CommandResult::from_error(COMMAND, &error),
        }

        CommandResult::output(output)
    })
}
