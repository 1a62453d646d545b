use leasedesk_core::config::AppConfig;
use leasedesk_core::messages::MessageReader;
use leasedesk_store::JsonMailbox;

use crate::commands::{block_on, CommandResult};

pub fn run(config: &AppConfig, query: &str) -> CommandResult {
    let reader = MessageReader::new(JsonMailbox::new(&config.mailbox.path));
    block_on("messages", async { CommandResult::output(reader.summarize(query).await) })
}
