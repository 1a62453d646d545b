use leasedesk_core::config::AppConfig;
use leasedesk_core::inventory::cache::lookup_property;
use leasedesk_store::JsonPropertyCache;

use crate::commands::{block_on, to_pretty_json, CommandResult};

const COMMAND: &str = "property";

/// Looks a property up in the local cache; an unknown name is reported, not failed.
pub fn run(config: &AppConfig, name: &str) -> CommandResult {
    let cache = JsonPropertyCache::new(&config.cache.path);
    block_on(COMMAND, async {
        match lookup_property(&cache, name).await {
            Ok(lookup) => to_pretty_json(COMMAND, &lookup),
            Err(error) => CommandResult::from_error(COMMAND, &error),
        }
    })
}
