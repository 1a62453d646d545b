use chrono::Local;
use leasedesk_agent::{
    IntakeStep, LeadPipeline, PropertyLookupStep, ReplyComposer, SchedulingStep,
};
use leasedesk_connectors::coda::CodaClient;
use leasedesk_connectors::google_calendar::GoogleCalendarClient;
use leasedesk_core::booking::booking_link;
use leasedesk_core::config::AppConfig;
use leasedesk_core::inventory::InventoryReader;
use leasedesk_core::messages::MessageReader;
use leasedesk_core::scheduling::SlotService;
use leasedesk_store::{JsonMailbox, JsonPropertyCache};

use crate::commands::{block_on, to_pretty_json, CommandResult, EXIT_CONFIG, EXIT_PIPELINE};

const COMMAND: &str = "run";

/// Wires the production adapters into the three-step lead pipeline.
pub fn build(config: &AppConfig) -> Result<LeadPipeline, CommandResult> {
    let coda = CodaClient::from_config(&config.coda)
        .map_err(|error| CommandResult::from_config_error(COMMAND, error))?;
    let reader = InventoryReader::from_config(coda, &config.coda)
        .map_err(|error| CommandResult::from_config_error(COMMAND, error))?;
    let calendar = GoogleCalendarClient::from_config(&config.calendar)
        .map_err(|error| CommandResult::from_transport_error(COMMAND, error))?;
    let composer =
        ReplyComposer::new(config.reply.signature.clone(), config.cache.name_column.clone())
            .map_err(|error| {
                CommandResult::failure(COMMAND, "config", error.to_string(), EXIT_CONFIG)
            })?;

    let link = booking_link(&config.calendar);
    Ok(LeadPipeline::new(composer, link)
        .with_step(IntakeStep::new(MessageReader::new(JsonMailbox::new(&config.mailbox.path))))
        .with_step(PropertyLookupStep::new(
            reader,
            JsonPropertyCache::new(&config.cache.path),
            config.cache.name_column.clone(),
        ))
        .with_step(SchedulingStep::new(SlotService::new(
            calendar,
            config.calendar.calendar_id.clone(),
            link,
        ))))
}

pub fn run(config: &AppConfig, query: &str) -> CommandResult {
    let pipeline = match build(config) {
        Ok(pipeline) => pipeline,
        Err(result) => return result,
    };

    block_on(COMMAND, async {
        match pipeline.run(query, Local::now().date_naive()).await {
            Ok(run) => to_pretty_json(COMMAND, &run),
            Err(failure) => {
                let mut result = to_pretty_json(COMMAND, &failure);
                result.exit_code = EXIT_PIPELINE;
                result
            }
        }
    })
}
