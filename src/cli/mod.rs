//! CLI module
//!
//! Parses arguments and dispatches to command implementations. All
//! subsystem wiring happens here; `main.rs` only calls `run`.

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use errors::{CliError, CliErrorCode, CliResult};

use clap::Parser;

/// Parse CLI arguments and run the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Scan { config, output } => commands::scan(&config, output.as_ref()),
        Command::Resume {
            config,
            token,
            output,
        } => commands::resume(&config, token.as_deref(), output.as_ref()),
        Command::Status { config } => commands::status(&config),
        Command::DecodeId { id } => commands::decode_id(&id),
    }
}
