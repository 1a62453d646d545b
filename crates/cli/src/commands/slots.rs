use chrono::Local;
use leasedesk_connectors::google_calendar::GoogleCalendarClient;
use leasedesk_core::booking::booking_link;
use leasedesk_core::config::AppConfig;
use leasedesk_core::scheduling::SlotService;

use crate::commands::{block_on, to_pretty_json, CommandResult};

const COMMAND: &str = "slots";

/// Friday tour slots for the next two weeks, as JSON.
pub fn run(config: &AppConfig) -> CommandResult {
    let client = match GoogleCalendarClient::from_config(&config.calendar) {
        Ok(client) => client,
        Err(error) => return CommandResult::from_transport_error(COMMAND, error),
    };
    let service = SlotService::new(
        client,
        config.calendar.calendar_id.clone(),
        booking_link(&config.calendar),
    );

    block_on(COMMAND, async {
        match service.report(Local::now().date_naive()).await {
            Ok(report) => to_pretty_json(COMMAND, &report),
            Err(error) => CommandResult::from_calendar_error(COMMAND, error),
        }
    })
}
