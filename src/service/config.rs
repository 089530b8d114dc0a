//! Configuration file for repovault
//!
//! ```json
//! {
//!   "backup": { "documents_per_file": 100000, "compress": true },
//!   "restore": { "include_binaries": true },
//!   "enumeration": { "poll_interval_ms": 100 }
//! }
//! ```
//!
//! Every section and field is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backup::{BackupError, BackupOptions, BackupResult, RestoreOptions};
use crate::cache::EnumerationConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepovaultConfig {
    #[serde(default)]
    pub backup: BackupOptions,

    #[serde(default)]
    pub restore: RestoreOptions,

    #[serde(default)]
    pub enumeration: EnumerationConfig,
}

impl RepovaultConfig {
    /// Load configuration from a JSON file and validate it
    pub fn load(path: &Path) -> BackupResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BackupError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: RepovaultConfig = serde_json::from_str(&content)
            .map_err(|e| BackupError::config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> BackupResult<()> {
        self.backup.validate()?;
        self.restore.validate()?;
        self.enumeration.validate()?;
        Ok(())
    }
}
