//! Backup file reader
//!
//! Replays the files written by [`BackupWriter`](super::BackupWriter) in
//! ordinal order.
//!
//! # Algorithm
//!
//! 1. If no file is open, resolve file N+1: compressed name first, then the
//!    plain name; if neither exists the sequence ends
//! 2. Decode the next record from the open file
//! 3. Clean end of file: close it and go back to 1
//! 4. Damaged record: record a problem, abandon the file, go back to 1;
//!    allowed once per call, a second damaged file ends the call
//! 5. Any other I/O failure: record a problem and end the sequence
//!
//! Resolution is per file, so a run that switched compression halfway is
//! read back without help.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::observability::{Diagnostics, Event};

use super::codec::DocumentCodec;
use super::errors::{BackupError, BackupResult};
use super::naming::BackupFileNaming;
use super::problems::ProblemLog;

struct OpenStream {
    path: PathBuf,
    input: Box<dyn BufRead + Send>,
}

/// Reads documents back from a backup directory.
///
/// Single-owner: not meant to be shared across threads.
pub struct BackupReader<C: DocumentCodec> {
    directory: PathBuf,
    naming: BackupFileNaming,
    codec: C,
    problems: ProblemLog,
    diagnostics: Diagnostics,
    current: Option<OpenStream>,
    /// Ordinal of the most recently opened file
    file_count: u64,
    documents_read: u64,
}

impl<C: DocumentCodec> BackupReader<C> {
    pub fn new(
        directory: impl Into<PathBuf>,
        naming: BackupFileNaming,
        codec: C,
        problems: ProblemLog,
    ) -> Self {
        Self {
            directory: directory.into(),
            naming,
            codec,
            problems,
            diagnostics: Diagnostics::disabled(),
            current: None,
            file_count: 0,
            documents_read: 0,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Next document, or `None` once the sequence is exhausted or unreadable.
    pub fn read(&mut self) -> Option<C::Document> {
        let mut skipped = false;

        loop {
            if self.current.is_none() {
                match self.open_next() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(err) => {
                        self.problems.record(err);
                        return None;
                    }
                }
            }

            let stream = self.current.as_mut()?;
            match self.codec.decode(stream.input.as_mut()) {
                Ok(Some(document)) => {
                    self.documents_read += 1;
                    self.diagnostics.metrics().increment_documents_read();
                    return Some(document);
                }
                Ok(None) => self.close(),
                Err(err) if err.is_corruption() => {
                    let path = stream.path.display().to_string();
                    self.problems.record(BackupError::corrupt(format!(
                        "skipping rest of {}: {}",
                        path, err
                    )));
                    self.diagnostics.metrics().increment_read_recoveries();
                    self.diagnostics.event(
                        Event::RestoreFileSkipped,
                        &[("path", path.as_str()), ("reason", err.to_string().as_str())],
                    );
                    self.close();

                    if skipped {
                        return None;
                    }
                    skipped = true;
                }
                Err(err) => {
                    let message = format!("failed to read {}: {}", stream.path.display(), err);
                    self.problems.record(BackupError::read_failed(message, None));
                    self.close();
                    return None;
                }
            }
        }
    }

    /// Close the open file, if any.
    ///
    /// Idempotent. The next [`read`](Self::read) opens the following file.
    pub fn close(&mut self) {
        self.current = None;
    }

    /// Documents returned so far
    pub fn documents_read(&self) -> u64 {
        self.documents_read
    }

    /// Files opened so far
    pub fn files_opened(&self) -> u64 {
        self.file_count
    }

    /// Iterate over the remaining documents
    pub fn into_documents(self) -> Documents<C> {
        Documents { reader: self }
    }

    /// Open the next file; `Ok(false)` when it does not exist.
    fn open_next(&mut self) -> BackupResult<bool> {
        let ordinal = self.file_count + 1;

        for compressed in [true, false] {
            let path = self.naming.path(&self.directory, ordinal, compressed);
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(BackupError::read_failed(
                        format!("failed to open {}", path.display()),
                        Some(err),
                    ))
                }
            };

            let input: Box<dyn BufRead + Send> = if compressed {
                Box::new(BufReader::new(GzDecoder::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };

            self.file_count = ordinal;
            self.diagnostics.metrics().increment_files_read();
            self.diagnostics
                .trace(Event::RestoreFileOpened, &[("path", path.display().to_string().as_str())]);
            self.current = Some(OpenStream { path, input });
            return Ok(true);
        }

        Ok(false)
    }
}

/// Iterator adapter over [`BackupReader::read`].
pub struct Documents<C: DocumentCodec> {
    reader: BackupReader<C>,
}

impl<C: DocumentCodec> Documents<C> {
    pub fn reader(&self) -> &BackupReader<C> {
        &self.reader
    }
}

impl<C: DocumentCodec> Iterator for Documents<C> {
    type Item = C::Document;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read()
    }
}

/// One backup file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFileEntry {
    pub ordinal: u64,
    pub path: PathBuf,
    pub compressed: bool,
}

/// List the files a reader would visit, in order.
///
/// Stops at the first missing ordinal, exactly as the reader does.
pub fn list_backup_files(directory: &Path, naming: &BackupFileNaming) -> Vec<BackupFileEntry> {
    let mut entries = Vec::new();

    for ordinal in 1.. {
        let compressed = naming.path(directory, ordinal, true);
        let entry = if compressed.is_file() {
            BackupFileEntry {
                ordinal,
                path: compressed,
                compressed: true,
            }
        } else {
            let plain = naming.path(directory, ordinal, false);
            if !plain.is_file() {
                break;
            }
            BackupFileEntry {
                ordinal,
                path: plain,
                compressed: false,
            }
        };
        entries.push(entry);
    }

    entries
}
