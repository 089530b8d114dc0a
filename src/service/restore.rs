//! Repository restore
//!
//! # Algorithm
//!
//! 1. With binaries and a binary area present: mark every stored binary
//!    unused, then store every binary file from the backup
//! 2. Remove all existing documents, key by key when the store cannot clear
//!    in one step
//! 3. Replay the content area, then the change area, so changes captured
//!    during the backup win over the older content
//! 4. With binaries: mark the binaries the summary lists as unused

use std::path::Path;

use crate::backup::{
    BackupError, BackupFileNaming, BackupReader, BackupResult, BinaryArea, ChangeSummary, JsonCodec,
    ProblemLog, RestoreOptions, BINARY_AREA_DIR, CHANGE_AREA_DIR,
};
use crate::observability::{Event, ObservationScope};
use crate::repository::{NodeDocument, StoreError};

use super::{display, BackupService};

impl BackupService {
    /// Replace the repository content with the backup in `directory`.
    ///
    /// # Errors
    ///
    /// Only invalid `options` are returned; failures during the restore are
    /// in the returned [`ProblemLog`].
    pub async fn restore_repository(
        &self,
        directory: &Path,
        options: &RestoreOptions,
    ) -> BackupResult<ProblemLog> {
        options.validate()?;
        let naming = Self::naming(options.filename_width)?;
        let problems = ProblemLog::with_diagnostics(self.diagnostics.clone());

        let dir = display(directory);
        let scope = ObservationScope::with_fields(self.diagnostics.logger(), "RESTORE", &[("dir", dir.as_str())]);

        if !directory.is_dir() {
            problems.record(BackupError::read_failed(
                format!("backup directory {} does not exist", dir),
                None,
            ));
            scope.fail("backup directory missing");
            return Ok(problems);
        }

        let change_dir = directory.join(CHANGE_AREA_DIR);
        let binary_area = BinaryArea::new(directory.join(BINARY_AREA_DIR));
        if options.include_binaries && binary_area.exists() {
            self.restore_binaries(&binary_area, &problems);
        }

        self.remove_all_documents(&problems).await;

        let content = self.replay(directory, "content", &naming, &problems);
        let changes = self.replay(&change_dir, "changes", &naming, &problems);

        if options.include_binaries {
            match ChangeSummary::read_from(&change_dir) {
                Ok(Some(summary)) => {
                    if let Err(err) = self.binaries.mark_as_unused(&summary.unused_binary_keys) {
                        problems.record(err.into());
                    }
                }
                Ok(None) => {}
                Err(err) => problems.record(err),
            }
        }

        let documents = (content + changes).to_string();
        if problems.has_errors() {
            scope.fail(&format!("{} problems recorded", problems.len()));
        } else {
            scope.complete_with_fields(&[("documents", documents.as_str())]);
        }
        Ok(problems)
    }

    fn restore_binaries(&self, area: &BinaryArea, problems: &ProblemLog) {
        let existing = match self.binaries.all_binary_keys() {
            Ok(keys) => keys,
            Err(err) => {
                problems.record(err.into());
                Vec::new()
            }
        };
        if let Err(err) = self.binaries.mark_as_unused(&existing) {
            problems.record(err.into());
        }

        let files = match area.list() {
            Ok(files) => files,
            Err(err) => {
                problems.record(err);
                return;
            }
        };

        for file in files {
            let content = match area.read(&file) {
                Ok(content) => content,
                Err(err) => {
                    problems.record(err);
                    continue;
                }
            };
            match self.binaries.store(&content) {
                Ok(stored) if stored != file.key => problems.record(BackupError::corrupt(format!(
                    "binary {} has content of {}",
                    file.key, stored
                ))),
                Ok(_) => {}
                Err(err) => problems.record(err.into()),
            }
        }
    }

    async fn remove_all_documents(&self, problems: &ProblemLog) {
        match self.documents.clear() {
            Ok(()) => return,
            Err(StoreError::Unsupported(_)) => {}
            Err(err) => {
                problems.record(err.into());
                return;
            }
        }

        // Best effort: a failed member is recorded, the others are still drained
        let mut keys = self.enumerator.enumerate_keys(self.documents.as_ref());
        loop {
            let key = match keys.next().await {
                Ok(Some(key)) => key,
                Ok(None) => break,
                Err(err) => {
                    problems.record(err.into());
                    continue;
                }
            };
            if let Err(err) = self.documents.remove(&key) {
                problems.record(err.into());
            }
        }
    }

    /// Put every document of one area back; returns how many were stored
    fn replay(&self, area: &Path, name: &str, naming: &BackupFileNaming, problems: &ProblemLog) -> u64 {
        let reader = BackupReader::new(area, naming.clone(), JsonCodec::<NodeDocument>::new(), problems.clone())
            .with_diagnostics(self.diagnostics.clone());

        let mut stored = 0;
        for document in reader.into_documents() {
            match self.documents.put(document) {
                Ok(()) => stored += 1,
                Err(err) => problems.record(err.into()),
            }
        }

        self.diagnostics.event(
            Event::RestoreDocumentsReplayed,
            &[("area", name), ("documents", stored.to_string().as_str())],
        );
        stored
    }
}
