use leasedesk_connectors::google_calendar::GoogleCalendarClient;
use leasedesk_connectors::oauth;
use leasedesk_core::config::AppConfig;

use crate::commands::{block_on, CommandResult};

const COMMAND: &str = "authorize";

/// One-time consent flow; the consent URL goes to stderr so stdout stays machine-readable.
pub fn run(config: &AppConfig) -> CommandResult {
    let client = match GoogleCalendarClient::from_config(&config.calendar) {
        Ok(client) => client,
        Err(error) => return CommandResult::from_transport_error(COMMAND, error),
    };

    block_on(COMMAND, async {
        let result = oauth::authorize(
            client.http(),
            &config.calendar.client_secrets_path,
            &config.calendar.token_path,
            |url| eprintln!("Open this URL in a browser to grant calendar access:\n\n  {url}\n"),
        )
        .await;

        match result {
            Ok(path) => CommandResult::success(
                COMMAND,
                format!("calendar token written to `{}`", path.display()),
            ),
            Err(error) => CommandResult::from_calendar_error(COMMAND, error),
        }
    })
}
