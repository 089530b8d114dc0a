//! Backup and restore options

use serde::{Deserialize, Serialize};

use super::errors::{BackupError, BackupResult};
use super::naming::DEFAULT_WIDTH;

/// How a backup run lays out its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOptions {
    /// Per-file document cap
    #[serde(default = "default_documents_per_file")]
    pub documents_per_file: u64,

    /// Gzip every document and binary file
    #[serde(default = "default_true")]
    pub compress: bool,

    /// Write the binary area and the change summary
    #[serde(default = "default_true")]
    pub include_binaries: bool,

    /// Zero-padded width of file ordinals
    #[serde(default = "default_filename_width")]
    pub filename_width: usize,
}

fn default_documents_per_file() -> u64 {
    100_000
}

fn default_true() -> bool {
    true
}

fn default_filename_width() -> usize {
    DEFAULT_WIDTH
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            documents_per_file: default_documents_per_file(),
            compress: true,
            include_binaries: true,
            filename_width: default_filename_width(),
        }
    }
}

impl BackupOptions {
    pub fn validate(&self) -> BackupResult<()> {
        if self.documents_per_file == 0 {
            return Err(BackupError::invalid_argument("documents_per_file must be > 0"));
        }
        if self.filename_width == 0 {
            return Err(BackupError::invalid_argument("filename_width must be > 0"));
        }
        Ok(())
    }
}

/// What a restore run brings back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOptions {
    /// Restore the binary area, when the backup has one
    #[serde(default = "default_true")]
    pub include_binaries: bool,

    /// Zero-padded width of file ordinals; must match the backup
    #[serde(default = "default_filename_width")]
    pub filename_width: usize,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            include_binaries: true,
            filename_width: default_filename_width(),
        }
    }
}

impl RestoreOptions {
    pub fn validate(&self) -> BackupResult<()> {
        if self.filename_width == 0 {
            return Err(BackupError::invalid_argument("filename_width must be > 0"));
        }
        Ok(())
    }
}
