//! Backup file format for repovault
//!
//! A backup is a directory of rotating document files plus optional side
//! areas.
//!
//! # Layout
//!
//! ```text
//! <backup_dir>/
//! ├── documents_000001.bin[.gz]        content area
//! ├── documents_000002.bin[.gz]
//! ├── changes/
//! │   ├── documents_000001.bin[.gz]    documents changed during the backup
//! │   └── summary_of_changes.json
//! └── binaries/ab/cd/ef/<key>.bin[.gz]
//! ```
//!
//! # Record framing
//!
//! Every document file is a sequence of codec-encoded records, each followed
//! by a single `\n`. Gzip, when enabled, wraps the whole file below the
//! framing.
//!
//! # Failure model
//!
//! [`BackupWriter`] and [`BackupReader`] never return operational errors.
//! They record them in a shared [`ProblemLog`] and keep going; only contract
//! violations (zero cap, empty prefix, zero width) are returned.

mod binaries;
mod codec;
mod errors;
mod naming;
mod options;
mod problems;
mod reader;
mod summary;
mod writer;

pub use binaries::{BinaryArea, BinaryFile};
pub use codec::{CodecError, DocumentCodec, JsonCodec, RECORD_DELIMITER};
pub use errors::{BackupError, BackupErrorCode, BackupResult, Severity};
pub use naming::{BackupFileNaming, DEFAULT_PREFIX, DEFAULT_WIDTH, DOCUMENT_EXTENSION, GZIP_EXTENSION};
pub use options::{BackupOptions, RestoreOptions};
pub use problems::{Problem, ProblemLog};
pub use reader::{list_backup_files, BackupFileEntry, BackupReader, Documents};
pub use summary::{ChangeSummary, SUMMARY_FILE_NAME};
pub use writer::BackupWriter;

/// Sub-directory holding documents changed during the backup window
pub const CHANGE_AREA_DIR: &str = "changes";

/// Sub-directory holding binary values
pub const BINARY_AREA_DIR: &str = "binaries";
