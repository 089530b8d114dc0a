//! CLI-specific error types
//!
//! Any CLI error ends the process with a non-zero status.

use std::fmt;
use std::io;

use crate::backup::{BackupError, BackupErrorCode};

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// Invalid command line value
    InvalidArgument,
    /// I/O error (stdout)
    IoError,
    /// The backup could not be read cleanly
    VerifyFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "REPOVAULT_CLI_CONFIG_ERROR",
            Self::InvalidArgument => "REPOVAULT_CLI_INVALID_ARGUMENT",
            Self::IoError => "REPOVAULT_CLI_IO_ERROR",
            Self::VerifyFailed => "REPOVAULT_CLI_VERIFY_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn verify_failed(problems: usize) -> Self {
        Self::new(
            CliErrorCode::VerifyFailed,
            format!("{} problem(s) found while reading the backup", problems),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<BackupError> for CliError {
    fn from(e: BackupError) -> Self {
        let code = match e.code() {
            BackupErrorCode::RepovaultBackupInvalidArgument => CliErrorCode::InvalidArgument,
            BackupErrorCode::RepovaultBackupConfig => CliErrorCode::ConfigError,
            BackupErrorCode::RepovaultBackupIo
            | BackupErrorCode::RepovaultBackupWriteFailed
            | BackupErrorCode::RepovaultBackupReadFailed
            | BackupErrorCode::RepovaultBackupCloseFailed => CliErrorCode::IoError,
            BackupErrorCode::RepovaultBackupCorrupt
            | BackupErrorCode::RepovaultBackupStore
            | BackupErrorCode::RepovaultBackupEnumeration => CliErrorCode::VerifyFailed,
        };
        Self::new(code, e.detail())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
