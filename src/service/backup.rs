//! Repository backup
//!
//! # Algorithm
//!
//! 1. Prepare the backup directory with its `changes/` and `binaries/` areas
//! 2. Register a usage tracker on the change bus; a blocking worker writes
//!    every node it reports to the change area
//! 3. Enumerate all document keys and write each document except the
//!    repository metadata document to the content area
//! 4. Write the metadata document last
//! 5. Unregister the tracker and stop forwarding changed nodes
//! 6. With binaries: write every stored binary, then the binaries that
//!    became used during the window, then the change summary
//! 7. Wait for the worker to drain, bounded by the changes timeout
//!
//! Nothing here aborts the run except an invalid call: every other failure is
//! recorded and the next phase still runs.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backup::{
    BackupError, BackupOptions, BackupResult, BackupWriter, BinaryArea, ChangeSummary, JsonCodec,
    ProblemLog, BINARY_AREA_DIR, CHANGE_AREA_DIR,
};
use crate::observability::{Event, ObservationScope};
use crate::repository::{BinaryKey, DocumentStore, NodeDocument, NodeKey};
use crate::usage::UsageTracker;

use super::{display, BackupService};

type DocumentWriter = BackupWriter<JsonCodec<NodeDocument>>;

impl BackupService {
    /// Back up the whole repository into `directory`.
    ///
    /// # Errors
    ///
    /// Only invalid `options` are returned. Everything that goes wrong while
    /// the backup runs is in the returned [`ProblemLog`].
    pub async fn backup_repository(
        &self,
        directory: &Path,
        options: &BackupOptions,
    ) -> BackupResult<ProblemLog> {
        options.validate()?;
        let naming = Self::naming(options.filename_width)?;
        let problems = ProblemLog::with_diagnostics(self.diagnostics.clone());

        let dir = display(directory);
        let scope = ObservationScope::with_fields(self.diagnostics.logger(), "BACKUP", &[("dir", dir.as_str())]);

        let change_dir = directory.join(CHANGE_AREA_DIR);
        if let Err(err) = prepare_area(directory, &change_dir) {
            problems.record(err);
            scope.fail("backup directory unusable");
            return Ok(problems);
        }

        let new_writer = |dir: &Path| -> BackupResult<DocumentWriter> {
            Ok(BackupWriter::new(
                dir,
                naming.clone(),
                options.documents_per_file,
                options.compress,
                JsonCodec::new(),
                problems.clone(),
            )?
            .with_diagnostics(self.diagnostics.clone()))
        };
        let mut content_writer = new_writer(directory)?;
        let changes_writer = new_writer(&change_dir)?;

        // Phase 0: observe changes made while the backup runs
        let metadata_key = self.documents.metadata_key();
        let (tracker, changed_nodes) = UsageTracker::channel();
        let tracker = Arc::new(tracker.with_diagnostics(self.diagnostics.clone()));
        let listener = self.change_bus.register(tracker.clone());
        self.diagnostics
            .event(Event::UsageWindowOpened, &[("listener", listener.to_string().as_str())]);

        let worker = {
            let documents = Arc::clone(&self.documents);
            let problems = problems.clone();
            let metadata_key = metadata_key.clone();
            tokio::task::spawn_blocking(move || {
                write_changed_documents(changed_nodes, documents, metadata_key, changes_writer, problems)
            })
        };

        // Phases 1 and 2: content, then the metadata document
        let written = self
            .write_content(&mut content_writer, &metadata_key, &problems)
            .await;
        content_writer.close();
        self.diagnostics
            .event(Event::BackupContentWritten, &[("documents", written.to_string().as_str())]);

        self.change_bus.unregister(listener);
        tracker.stop_forwarding();

        // Phases 3 to 5: binaries and the change summary
        if options.include_binaries {
            let area = BinaryArea::new(directory.join(BINARY_AREA_DIR));
            let binaries = self.write_binaries(&area, &tracker, options.compress, &problems);
            self.diagnostics
                .event(Event::BackupBinariesWritten, &[("binaries", binaries.to_string().as_str())]);

            let summary = ChangeSummary::new(
                tracker.unused_binary_keys().into_iter().collect(),
                tracker.used_binary_keys().into_iter().collect(),
            );
            if let Err(err) = summary.write_to(&change_dir) {
                problems.record(err);
            }
        }

        match tokio::time::timeout(self.changes_timeout, worker).await {
            Ok(Ok(changed)) => self
                .diagnostics
                .event(Event::BackupChangesDrained, &[("documents", changed.to_string().as_str())]),
            Ok(Err(join_error)) => problems.record(BackupError::write_failed(
                format!("changed document worker failed: {}", join_error),
                None,
            )),
            Err(_) => problems.record(BackupError::write_failed(
                format!(
                    "changed documents not written within {}s",
                    self.changes_timeout.as_secs()
                ),
                None,
            )),
        }

        let documents = content_writer.document_count().to_string();
        if problems.has_errors() {
            scope.fail(&format!("{} problems recorded", problems.len()));
        } else {
            scope.complete_with_fields(&[("documents", documents.as_str())]);
        }
        Ok(problems)
    }

    /// Write every document, the metadata document last.
    ///
    /// Enumeration failures are recorded and enumeration goes on with the
    /// members that are still answering.
    async fn write_content(
        &self,
        writer: &mut DocumentWriter,
        metadata_key: &NodeKey,
        problems: &ProblemLog,
    ) -> u64 {
        let mut written = 0;
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
            if key == *metadata_key {
                continue;
            }
            if write_document(self.documents.as_ref(), &key, writer, problems) {
                written += 1;
            }
        }

        if write_document(self.documents.as_ref(), metadata_key, writer, problems) {
            written += 1;
        }
        written
    }

    /// Write stored binaries plus those that became used during the window
    fn write_binaries(
        &self,
        area: &BinaryArea,
        tracker: &UsageTracker,
        compress: bool,
        problems: &ProblemLog,
    ) -> u64 {
        let mut written = BTreeSet::new();

        let stored = match self.binaries.all_binary_keys() {
            Ok(keys) => keys,
            Err(err) => {
                problems.record(err.into());
                Vec::new()
            }
        };

        for key in stored.into_iter().chain(tracker.used_binary_keys()) {
            if written.contains(&key) {
                continue;
            }
            if self.write_binary(area, &key, compress, problems) {
                written.insert(key);
            }
        }
        written.len() as u64
    }

    fn write_binary(&self, area: &BinaryArea, key: &BinaryKey, compress: bool, problems: &ProblemLog) -> bool {
        let content = match self.binaries.read(key) {
            Ok(content) => content,
            Err(err) => {
                problems.record(BackupError::store(format!("binary {}: {}", key, err)));
                return false;
            }
        };
        match area.write(key, &content, compress) {
            Ok(_) => true,
            Err(err) => {
                problems.record(err);
                false
            }
        }
    }
}

/// Create the backup directory and its change area.
///
/// An existing directory is reused; a path that is not a directory is not.
fn prepare_area(directory: &Path, change_dir: &Path) -> BackupResult<()> {
    if directory.exists() && !directory.is_dir() {
        return Err(BackupError::invalid_argument(format!(
            "backup location {} is not a directory",
            directory.display()
        )));
    }
    fs::create_dir_all(change_dir).map_err(|e| BackupError::io_error_at_path(change_dir, e))
}

/// Look up `key` and write it; false if nothing was written
fn write_document(
    documents: &dyn DocumentStore,
    key: &NodeKey,
    writer: &mut DocumentWriter,
    problems: &ProblemLog,
) -> bool {
    match documents.get(key) {
        Ok(Some(document)) => {
            writer.write(&document);
            true
        }
        // Removed since it was enumerated
        Ok(None) => false,
        Err(err) => {
            problems.record(BackupError::store(format!("document {}: {}", key, err)));
            false
        }
    }
}

/// Body of the changed-document worker.
///
/// Runs until the tracker stops forwarding and the queue is empty.
fn write_changed_documents(
    mut changed_nodes: mpsc::UnboundedReceiver<NodeKey>,
    documents: Arc<dyn DocumentStore>,
    metadata_key: NodeKey,
    mut writer: DocumentWriter,
    problems: ProblemLog,
) -> u64 {
    let mut written = 0;
    while let Some(key) = changed_nodes.blocking_recv() {
        if key == metadata_key {
            continue;
        }
        if write_document(documents.as_ref(), &key, &mut writer, &problems) {
            written += 1;
        }
    }
    writer.close();
    written
}
