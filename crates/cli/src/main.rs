use std::process::ExitCode;

fn main() -> ExitCode {
    leasedesk_cli::run()
}
