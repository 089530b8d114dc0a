//! Summary of changes observed during a backup window
//!
//! Location inside the backup: `changes/summary_of_changes.json`
//!
//! ```json
//! {
//!   "unusedBinaryKeys": ["ab12...", "..."],
//!   "usedBinaryKeys": ["..."],
//!   "createdAt": "2026-10-16T12:00:00Z"
//! }
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::BinaryKey;

use super::errors::{BackupError, BackupResult};

/// File name inside the change area
pub const SUMMARY_FILE_NAME: &str = "summary_of_changes.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    /// Binaries that became unused while the backup ran
    #[serde(default)]
    pub unused_binary_keys: Vec<BinaryKey>,

    /// Binaries that became used while the backup ran
    #[serde(default)]
    pub used_binary_keys: Vec<BinaryKey>,

    pub created_at: DateTime<Utc>,
}

impl ChangeSummary {
    /// Keys are stored sorted
    pub fn new(mut unused_binary_keys: Vec<BinaryKey>, mut used_binary_keys: Vec<BinaryKey>) -> Self {
        unused_binary_keys.sort();
        used_binary_keys.sort();
        Self {
            unused_binary_keys,
            used_binary_keys,
            created_at: Utc::now(),
        }
    }

    pub fn write_to(&self, change_dir: &Path) -> BackupResult<()> {
        let path = change_dir.join(SUMMARY_FILE_NAME);
        let json = serde_json::to_vec_pretty(self).map_err(|e| {
            BackupError::write_failed(format!("failed to serialize change summary: {}", e), None)
        })?;

        let mut file = File::create(&path).map_err(|e| BackupError::io_error_at_path(&path, e))?;
        file.write_all(&json)
            .and_then(|_| file.sync_all())
            .map_err(|e| BackupError::io_error_at_path(&path, e))
    }

    /// Read the summary; `Ok(None)` if the backup has none
    pub fn read_from(change_dir: &Path) -> BackupResult<Option<Self>> {
        let path = change_dir.join(SUMMARY_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }

        let json = fs::read(&path).map_err(|e| BackupError::io_error_at_path(&path, e))?;
        serde_json::from_slice(&json).map(Some).map_err(|e| {
            BackupError::corrupt(format!("invalid change summary {}: {}", path.display(), e))
        })
    }
}
