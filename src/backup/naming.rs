//! Backup file naming
//!
//! Writer and reader must agree bit-exactly on file names:
//!
//! ```text
//! <prefix>_<ordinal zero-padded to width>.bin[.gz]
//! ```
//!
//! Zero padding keeps lexicographic and numeric order identical as long as
//! ordinals fit the width.

use std::path::{Path, PathBuf};

use super::errors::{BackupError, BackupResult};

/// Extension of every document file
pub const DOCUMENT_EXTENSION: &str = ".bin";

/// Extra extension of compressed files
pub const GZIP_EXTENSION: &str = ".gz";

/// Prefix used by the backup service for document files
pub const DEFAULT_PREFIX: &str = "documents";

/// Default ordinal width
pub const DEFAULT_WIDTH: usize = 6;

/// Prefix and padding width shared by a writer and its reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFileNaming {
    prefix: String,
    width: usize,
}

impl BackupFileNaming {
    /// # Errors
    ///
    /// An empty prefix or a zero width is an invalid argument.
    pub fn new(prefix: impl Into<String>, width: usize) -> BackupResult<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(BackupError::invalid_argument("file prefix must not be empty"));
        }
        if width == 0 {
            return Err(BackupError::invalid_argument("ordinal width must be > 0"));
        }
        Ok(Self { prefix, width })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// File name for `ordinal` (1-based)
    pub fn file_name(&self, ordinal: u64, compressed: bool) -> String {
        format!(
            "{}_{:0width$}{}{}",
            self.prefix,
            ordinal,
            DOCUMENT_EXTENSION,
            if compressed { GZIP_EXTENSION } else { "" },
            width = self.width
        )
    }

    pub fn path(&self, directory: &Path, ordinal: u64, compressed: bool) -> PathBuf {
        directory.join(self.file_name(ordinal, compressed))
    }
}

impl Default for BackupFileNaming {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            width: DEFAULT_WIDTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let naming = BackupFileNaming::new("run", 2).unwrap();
        assert_eq!(naming.file_name(1, false), "run_01.bin");
        assert_eq!(naming.file_name(3, true), "run_03.bin.gz");
        assert_eq!(naming.file_name(123, false), "run_123.bin");
    }

    #[test]
    fn test_default_naming() {
        let naming = BackupFileNaming::default();
        assert_eq!(naming.file_name(1, true), "documents_000001.bin.gz");
    }

    #[test]
    fn test_padding_preserves_order() {
        let naming = BackupFileNaming::default();
        let mut names: Vec<String> = [10u64, 2, 1, 100].iter().map(|o| naming.file_name(*o, false)).collect();
        names.sort();
        assert_eq!(names[0], "documents_000001.bin");
        assert_eq!(names[3], "documents_000100.bin");
    }

    #[test]
    fn test_invalid_naming_rejected() {
        assert!(BackupFileNaming::new("", 6).is_err());
        assert!(BackupFileNaming::new("documents", 0).is_err());
    }
}
