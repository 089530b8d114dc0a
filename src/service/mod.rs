//! Backup and restore of a whole repository
//!
//! [`BackupService`] drives the pieces in order: key enumeration feeds the
//! content writer, a [`UsageTracker`](crate::usage::UsageTracker) watches the
//! change feed for the duration, and binaries plus a change summary follow.
//! Restore replays the same layout back into the stores.
//!
//! Both operations return the [`ProblemLog`](crate::backup::ProblemLog) of the
//! run. An `Err` means the call itself was invalid and nothing was done.

mod backup;
mod config;
mod restore;

pub use config::RepovaultConfig;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::backup::{BackupFileNaming, DEFAULT_PREFIX};
use crate::backup::BackupResult;
use crate::cache::{DistributedKeyEnumerator, EnumerationConfig};
use crate::observability::Diagnostics;
use crate::repository::{BinaryStore, DocumentStore};
use crate::usage::ChangeBus;

/// How long a backup waits for changed documents to be written
const DEFAULT_CHANGES_TIMEOUT: Duration = Duration::from_secs(30);

/// Backs up and restores one repository.
pub struct BackupService {
    documents: Arc<dyn DocumentStore>,
    binaries: Arc<dyn BinaryStore>,
    change_bus: Arc<dyn ChangeBus>,
    enumerator: DistributedKeyEnumerator,
    diagnostics: Diagnostics,
    changes_timeout: Duration,
}

impl BackupService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        binaries: Arc<dyn BinaryStore>,
        change_bus: Arc<dyn ChangeBus>,
    ) -> Self {
        Self {
            documents,
            binaries,
            change_bus,
            enumerator: DistributedKeyEnumerator::default(),
            diagnostics: Diagnostics::disabled(),
            changes_timeout: DEFAULT_CHANGES_TIMEOUT,
        }
    }

    pub fn with_enumeration(mut self, config: EnumerationConfig) -> Self {
        self.enumerator = DistributedKeyEnumerator::new(config).with_diagnostics(self.diagnostics.clone());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.enumerator = self.enumerator.with_diagnostics(diagnostics.clone());
        self.diagnostics = diagnostics;
        self
    }

    /// Upper bound on waiting for the changed-document worker
    pub fn with_changes_timeout(mut self, timeout: Duration) -> Self {
        self.changes_timeout = timeout;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn naming(width: usize) -> BackupResult<BackupFileNaming> {
        BackupFileNaming::new(DEFAULT_PREFIX, width)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
