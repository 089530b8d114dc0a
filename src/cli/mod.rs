//! CLI module for repovault
//!
//! Provides command-line inspection of backup directories:
//! - files: list backup files in read order
//! - dump: print every document
//! - verify: read everything and report problems

mod args;
mod commands;
mod errors;

pub use args::{BackupArgs, Cli, Command};
pub use commands::{dump, files, run_command, verify};
pub use errors::{CliError, CliErrorCode, CliResult};

use std::io;

/// Parse arguments and run the selected command against stdout
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(cli.command, &mut out)
}
