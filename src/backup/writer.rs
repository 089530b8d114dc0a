//! Rotating backup file writer
//!
//! # Algorithm
//!
//! For each document:
//! 1. Count it toward the run total
//! 2. Encode it into a scratch buffer and append the record delimiter
//! 3. If the open file already holds the per-file cap, close it
//! 4. If no file is open, create file N+1
//! 5. Write the framed record in one call
//!
//! # Invariants
//!
//! - A file is created only when there is a record to put in it
//! - A closed file is never reopened; the ordinal only grows
//! - Compression sits below the record framing
//! - Failures are recorded in the [`ProblemLog`], never returned
//!
//! Explicit [`BackupWriter::close`] and cap-driven rotation share one path,
//! so closing between writes is how callers start a new file early.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::observability::{Diagnostics, Event};

use super::codec::{DocumentCodec, RECORD_DELIMITER};
use super::errors::{BackupError, BackupResult};
use super::naming::BackupFileNaming;
use super::problems::ProblemLog;

/// Byte sink below the framing: plain or gzip.
enum OutputStream {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputStream {
    fn open(path: &Path, compress: bool) -> io::Result<Self> {
        let file = BufWriter::new(File::create(path)?);
        Ok(if compress {
            OutputStream::Gzip(GzEncoder::new(file, Compression::default()))
        } else {
            OutputStream::Plain(file)
        })
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            OutputStream::Plain(out) => out.write_all(bytes),
            OutputStream::Gzip(out) => out.write_all(bytes),
        }
    }

    /// Write the gzip trailer if any, flush, and fsync
    fn finish(self) -> io::Result<()> {
        let mut file = match self {
            OutputStream::Plain(out) => out,
            OutputStream::Gzip(out) => out.finish()?,
        };
        file.flush()?;
        file.get_ref().sync_all()
    }
}

struct OpenFile {
    path: PathBuf,
    stream: OutputStream,
    documents: u64,
}

/// Appends documents to a rotating sequence of backup files.
///
/// Single-owner: not meant to be shared across threads.
pub struct BackupWriter<C: DocumentCodec> {
    directory: PathBuf,
    naming: BackupFileNaming,
    max_documents_per_file: u64,
    compress: bool,
    codec: C,
    problems: ProblemLog,
    diagnostics: Diagnostics,
    current: Option<OpenFile>,
    buffer: Vec<u8>,
    /// Ordinal of the most recently created file
    file_count: u64,
    document_count: u64,
}

impl<C: DocumentCodec> BackupWriter<C> {
    /// Create a writer over `directory`.
    ///
    /// No file is created until the first [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// A zero `max_documents_per_file` is an invalid argument.
    pub fn new(
        directory: impl Into<PathBuf>,
        naming: BackupFileNaming,
        max_documents_per_file: u64,
        compress: bool,
        codec: C,
        problems: ProblemLog,
    ) -> BackupResult<Self> {
        if max_documents_per_file == 0 {
            return Err(BackupError::invalid_argument(
                "max_documents_per_file must be > 0",
            ));
        }

        Ok(Self {
            directory: directory.into(),
            naming,
            max_documents_per_file,
            compress,
            codec,
            problems,
            diagnostics: Diagnostics::disabled(),
            current: None,
            buffer: Vec::new(),
            file_count: 0,
            document_count: 0,
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Append one document.
    ///
    /// The run total counts every call, including documents whose write
    /// failed; the failure itself goes to the problem log.
    pub fn write(&mut self, document: &C::Document) {
        self.document_count += 1;

        self.buffer.clear();
        if let Err(err) = self.codec.encode(document, &mut self.buffer) {
            self.problems.record(BackupError::write_failed(
                format!("failed to encode document {}: {}", self.document_count, err),
                None,
            ));
            return;
        }
        self.buffer.push(RECORD_DELIMITER);

        if let Some(open) = &self.current {
            if open.documents >= self.max_documents_per_file {
                self.close();
            }
        }

        if self.current.is_none() {
            if let Err(err) = self.open_next() {
                self.problems.record(err);
                return;
            }
        }

        let Some(open) = self.current.as_mut() else {
            return;
        };
        match open.stream.write_all(&self.buffer) {
            Ok(()) => {
                open.documents += 1;
                self.diagnostics.metrics().increment_documents_written();
            }
            Err(err) => {
                let message = format!("failed to write document to {}", open.path.display());
                self.problems.record(BackupError::write_failed(message, Some(err)));
                // The tail of a failed write is unknown; start over in a new file
                self.close();
            }
        }
    }

    /// Finish and close the open file, if any.
    ///
    /// The writer stays usable; the next write creates a new file.
    pub fn close(&mut self) {
        let Some(open) = self.current.take() else {
            return;
        };

        let documents = open.documents.to_string();
        let path = open.path.display().to_string();
        match open.stream.finish() {
            Ok(()) => self.diagnostics.trace(
                Event::BackupFileClosed,
                &[("documents", documents.as_str()), ("path", path.as_str())],
            ),
            Err(err) => self
                .problems
                .record(BackupError::close_failed(format!("failed to close {}", path), err)),
        }
    }

    /// Documents passed to [`write`](Self::write) so far
    pub fn document_count(&self) -> u64 {
        self.document_count
    }

    /// Files created so far
    pub fn file_count(&self) -> u64 {
        self.file_count
    }

    /// Path of the open file
    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_ref().map(|open| open.path.as_path())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn open_next(&mut self) -> BackupResult<()> {
        let ordinal = self.file_count + 1;
        let path = self.naming.path(&self.directory, ordinal, self.compress);
        let stream = OutputStream::open(&path, self.compress).map_err(|e| {
            BackupError::write_failed(format!("failed to create {}", path.display()), Some(e))
        })?;

        self.file_count = ordinal;
        self.diagnostics.metrics().increment_files_written();
        self.diagnostics.trace(
            Event::BackupFileOpened,
            &[("path", path.display().to_string().as_str())],
        );

        self.current = Some(OpenFile {
            path,
            stream,
            documents: 0,
        });
        Ok(())
    }
}

impl<C: DocumentCodec> Drop for BackupWriter<C> {
    fn drop(&mut self) {
        self.close();
    }
}
