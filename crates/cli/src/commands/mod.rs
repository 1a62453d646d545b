pub mod authorize;
pub mod booking_link;
pub mod config;
pub mod doctor;
pub mod inventory;
pub mod messages;
pub mod pipeline;
pub mod property;
pub mod slots;
pub mod tables;

use std::future::Future;

use leasedesk_core::errors::{ApplicationError, CalendarError, TransportError};
use leasedesk_core::ConfigError;
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_CREDENTIALS: u8 = 3;
pub const EXIT_INTEGRATION: u8 = 4;
pub const EXIT_PIPELINE: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Plain command output; the result itself is what gets printed.
    pub fn output(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), exit_code_for(error))
    }

    pub fn from_config_error(command: &str, error: ConfigError) -> Self {
        Self::from_error(command, &ApplicationError::from(error))
    }

    pub fn from_calendar_error(command: &str, error: CalendarError) -> Self {
        Self::from_error(command, &ApplicationError::from(error))
    }

    pub fn from_transport_error(command: &str, error: TransportError) -> Self {
        Self::from_error(command, &ApplicationError::from(error))
    }
}

pub fn exit_code_for(error: &ApplicationError) -> u8 {
    match error {
        ApplicationError::Configuration(_) => EXIT_CONFIG,
        ApplicationError::Credentials(_) => EXIT_CREDENTIALS,
        ApplicationError::Persistence(_)
        | ApplicationError::Integration(_)
        | ApplicationError::Domain(_) => EXIT_INTEGRATION,
    }
}

/// Drives one command on a fresh current-thread runtime.
pub fn block_on<F>(command: &str, future: F) -> CommandResult
where
    F: Future<Output = CommandResult>,
{
    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(future),
        Err(error) => CommandResult::failure(
            command,
            "runtime",
            format!("failed to initialize async runtime: {error}"),
            EXIT_INTEGRATION,
        ),
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn to_pretty_json<T: Serialize>(command: &str, value: &T) -> CommandResult {
    match serde_json::to_string_pretty(value) {
        Ok(output) => CommandResult::output(output),
        Err(error) => CommandResult::failure(
            command,
            "serialization",
            error.to_string(),
            EXIT_INTEGRATION,
        ),
    }
}
