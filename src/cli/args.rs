//! CLI argument definitions using clap
//!
//! Commands:
//! - repovault files <dir>
//! - repovault dump <dir>
//! - repovault verify <dir>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::backup::DEFAULT_PREFIX;

/// repovault - inspect repository backups
#[derive(Parser, Debug)]
#[command(name = "repovault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List backup files in the order a restore reads them
    Files(BackupArgs),

    /// Print every document as one JSON line
    Dump(BackupArgs),

    /// Read every document and report problems
    Verify(BackupArgs),
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    /// Backup directory, or one of its areas
    pub dir: PathBuf,

    /// File name prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Zero-padded ordinal width (default: from config, else 6)
    #[arg(long)]
    pub width: Option<usize>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also log trace events to the console
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
