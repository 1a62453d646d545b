use leasedesk_connectors::coda::CodaClient;
use leasedesk_core::config::AppConfig;
use leasedesk_core::ports::TabularStore;

use crate::commands::{block_on, CommandResult, EXIT_CONFIG};

const COMMAND: &str = "tables";

/// Lists the tables in the configured doc, to help fill in the table ids.
pub fn run(config: &AppConfig) -> CommandResult {
    let client = match CodaClient::from_config(&config.coda) {
        Ok(client) => client,
        Err(error) => return CommandResult::from_config_error(COMMAND, error),
    };
    if config.coda.doc_id.trim().is_empty() {
        return CommandResult::failure(
            COMMAND,
            "config",
            "coda.doc_id is required to list tables",
            EXIT_CONFIG,
        );
    }

    block_on(COMMAND, async {
        match client.list_tables(&config.coda.doc_id).await {
            Ok(tables) if tables.is_empty() => CommandResult::output("No tables found."),
            Ok(tables) => CommandResult::output(
                tables
                    .iter()
                    .map(|table| format!("{}\t{}", table.id, table.name))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Err(error) => CommandResult::from_transport_error(COMMAND, error),
        }
    })
}
