//! Backup-specific error types
//!
//! Backup errors follow one model:
//! - Structured error codes in REPOVAULT_BACKUP_NAME format
//! - Clear severity levels
//! - No silent failures: anything not returned lands in a [`ProblemLog`]
//!
//! Only contract violations are returned to callers. Operational failures
//! during a run (a bad write, a corrupt file) are recorded and the run goes on.
//!
//! [`ProblemLog`]: super::ProblemLog

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Data was skipped but the run recovered
    Warning,
    /// Operation failed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Backup error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupErrorCode {
    /// Caller violated a documented contract
    RepovaultBackupInvalidArgument,
    /// Configuration could not be loaded or is invalid
    RepovaultBackupConfig,
    /// Generic filesystem failure
    RepovaultBackupIo,
    /// A document could not be written
    RepovaultBackupWriteFailed,
    /// A backup file could not be read
    RepovaultBackupReadFailed,
    /// A backup file holds a partial or malformed record
    RepovaultBackupCorrupt,
    /// Finishing a backup file failed
    RepovaultBackupCloseFailed,
    /// The repository rejected an operation
    RepovaultBackupStore,
    /// Key enumeration failed on a cluster member
    RepovaultBackupEnumeration,
}

impl BackupErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupErrorCode::RepovaultBackupInvalidArgument => "REPOVAULT_BACKUP_INVALID_ARGUMENT",
            BackupErrorCode::RepovaultBackupConfig => "REPOVAULT_BACKUP_CONFIG",
            BackupErrorCode::RepovaultBackupIo => "REPOVAULT_BACKUP_IO",
            BackupErrorCode::RepovaultBackupWriteFailed => "REPOVAULT_BACKUP_WRITE_FAILED",
            BackupErrorCode::RepovaultBackupReadFailed => "REPOVAULT_BACKUP_READ_FAILED",
            BackupErrorCode::RepovaultBackupCorrupt => "REPOVAULT_BACKUP_CORRUPT",
            BackupErrorCode::RepovaultBackupCloseFailed => "REPOVAULT_BACKUP_CLOSE_FAILED",
            BackupErrorCode::RepovaultBackupStore => "REPOVAULT_BACKUP_STORE",
            BackupErrorCode::RepovaultBackupEnumeration => "REPOVAULT_BACKUP_ENUMERATION",
        }
    }

    /// Returns the severity level for this error code
    ///
    /// Corruption is a warning: the reader skips the file and carries on.
    pub fn severity(&self) -> Severity {
        match self {
            BackupErrorCode::RepovaultBackupCorrupt => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for BackupErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backup error with full context
#[derive(Debug)]
pub struct BackupError {
    code: BackupErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl BackupError {
    fn new(code: BackupErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// A contract violation by the caller
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupInvalidArgument, message, None)
    }

    /// Configuration could not be loaded or validated
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupConfig, message, None)
    }

    /// Creates an I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupIo, message, Some(source))
    }

    /// Creates an I/O error at a specific path
    pub fn io_error_at_path(path: &Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at {}", path.display()), source)
    }

    pub fn write_failed(message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupWriteFailed, message, source)
    }

    pub fn read_failed(message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupReadFailed, message, source)
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupCorrupt, message, None)
    }

    pub fn close_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupCloseFailed, message, Some(source))
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupStore, message, None)
    }

    pub fn enumeration(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::RepovaultBackupEnumeration, message, None)
    }

    /// Returns the error code
    pub fn code(&self) -> BackupErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the severity of this error
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Message plus the underlying cause, without the code prefix
    pub fn detail(&self) -> String {
        match &self.source {
            Some(source) => format!("{} (caused by: {})", self.message, source),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.detail())
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for backup operations
pub type BackupResult<T> = Result<T, BackupError>;

impl From<crate::cache::EnumerationError> for BackupError {
    fn from(err: crate::cache::EnumerationError) -> Self {
        BackupError::enumeration(err.to_string())
    }
}

impl From<crate::repository::StoreError> for BackupError {
    fn from(err: crate::repository::StoreError) -> Self {
        BackupError::store(err.to_string())
    }
}
