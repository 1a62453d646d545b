pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use leasedesk_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "leasedesk",
    about = "Leasing desk lead intake CLI",
    long_about = "Read property inventory, search inbound inquiries, propose tour slots, and draft lead replies.",
    after_help = "Examples:\n  leasedesk inventory\n  leasedesk property \"Downtown Office\"\n  leasedesk run --query \"main street\""
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a leasedesk.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Read both inventory tables, print them, and refresh the property cache")]
    Inventory,
    #[command(about = "Look up one property by name in the local cache")]
    Property {
        #[arg(help = "Property name; case and spacing are ignored")]
        name: String,
    },
    #[command(about = "List stored inquiry messages matching a query")]
    Messages {
        #[arg(long, default_value = "", help = "Case-insensitive text to search for")]
        query: String,
    },
    #[command(about = "Show Friday tour slots for the next two weeks")]
    Slots,
    #[command(about = "Print the configured booking link")]
    BookingLink,
    #[command(about = "Process one inquiry end to end and draft the reply")]
    Run {
        #[arg(long, default_value = "", help = "Text that selects the inquiry to answer")]
        query: String,
    },
    #[command(about = "List the tables in the configured inventory doc")]
    Tables,
    #[command(about = "Grant calendar access and store the token file")]
    Authorize,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Check config, credentials, mailbox, and property cache readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn with_config(
    options: LoadOptions,
    command: &str,
    run: impl FnOnce(&AppConfig) -> CommandResult,
) -> CommandResult {
    match AppConfig::load(options) {
        Ok(config) => {
            init_logging(&config);
            run(&config)
        }
        Err(error) => CommandResult::from_config_error(command, error),
    }
}

pub fn execute(cli: Cli) -> CommandResult {
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    match cli.command {
        Command::Inventory => with_config(options, "inventory", commands::inventory::run),
        Command::Property { name } => {
            with_config(options, "property", |config| commands::property::run(config, &name))
        }
        Command::Messages { query } => {
            with_config(options, "messages", |config| commands::messages::run(config, &query))
        }
        Command::Slots => with_config(options, "slots", commands::slots::run),
        Command::BookingLink => with_config(options, "booking-link", commands::booking_link::run),
        Command::Run { query } => {
            with_config(options, "run", |config| commands::pipeline::run(config, &query))
        }
        Command::Tables => with_config(options, "tables", commands::tables::run),
        Command::Authorize => with_config(options, "authorize", commands::authorize::run),
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
    }
}

pub fn run() -> ExitCode {
    let result = execute(Cli::parse());

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
