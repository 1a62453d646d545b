use leasedesk_core::booking::booking_link;
use leasedesk_core::config::AppConfig;

use crate::commands::CommandResult;

pub fn run(config: &AppConfig) -> CommandResult {
    CommandResult::output(booking_link(&config.calendar))
}
