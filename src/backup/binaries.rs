//! Binary area
//!
//! Binary values are stored one file per key, sharded by the first three
//! byte pairs of the key so no directory grows too large:
//!
//! ```text
//! binaries/ab/cd/ef/abcdef0123....bin[.gz]
//! ```
//!
//! Compression is chosen per file at write time and detected from the
//! extension at read time.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::repository::BinaryKey;

use super::errors::{BackupError, BackupResult};
use super::naming::{DOCUMENT_EXTENSION, GZIP_EXTENSION};

const SHARD_DEPTH: usize = 3;
const SHARD_WIDTH: usize = 2;

/// One binary file found in the area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFile {
    pub key: BinaryKey,
    pub path: PathBuf,
    pub compressed: bool,
}

/// The `binaries/` directory of a backup.
#[derive(Debug, Clone)]
pub struct BinaryArea {
    root: PathBuf,
}

impl BinaryArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Where the file for `key` lives
    pub fn path_for(&self, key: &BinaryKey, compressed: bool) -> PathBuf {
        let mut path = self.root.clone();
        let hex = key.as_str();
        for level in 0..SHARD_DEPTH {
            let start = level * SHARD_WIDTH;
            path.push(&hex[start..start + SHARD_WIDTH]);
        }
        let ext = if compressed {
            format!("{}{}", DOCUMENT_EXTENSION, GZIP_EXTENSION)
        } else {
            DOCUMENT_EXTENSION.to_string()
        };
        path.push(format!("{}{}", hex, ext));
        path
    }

    /// Write one binary value, creating shard directories as needed.
    pub fn write(&self, key: &BinaryKey, content: &[u8], compress: bool) -> BackupResult<PathBuf> {
        let path = self.path_for(key, compress);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BackupError::io_error_at_path(parent, e))?;
        }

        let failed = |e| BackupError::write_failed(format!("failed to write binary {}", key), Some(e));
        let file = File::create(&path).map_err(failed)?;
        if compress {
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(content).map_err(failed)?;
            encoder.finish().and_then(|f| f.sync_all()).map_err(failed)?;
        } else {
            let mut file = file;
            file.write_all(content).map_err(failed)?;
            file.sync_all().map_err(failed)?;
        }

        Ok(path)
    }

    /// Read the content of a binary file
    pub fn read(&self, file: &BinaryFile) -> BackupResult<Vec<u8>> {
        let failed = |e| {
            BackupError::read_failed(format!("failed to read {}", file.path.display()), Some(e))
        };
        let handle = File::open(&file.path).map_err(failed)?;

        let mut content = Vec::new();
        if file.compressed {
            GzDecoder::new(handle).read_to_end(&mut content).map_err(failed)?;
        } else {
            let mut handle = handle;
            handle.read_to_end(&mut content).map_err(failed)?;
        }
        Ok(content)
    }

    /// Every binary file in the area, sorted by key.
    ///
    /// Files whose names are not valid keys are ignored.
    pub fn list(&self) -> BackupResult<Vec<BinaryFile>> {
        let mut files = Vec::new();
        if self.exists() {
            self.collect(&self.root, 0, &mut files)?;
        }
        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    fn collect(&self, dir: &Path, depth: usize, files: &mut Vec<BinaryFile>) -> BackupResult<()> {
        let entries = fs::read_dir(dir).map_err(|e| BackupError::io_error_at_path(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| BackupError::io_error_at_path(dir, e))?.path();
            if depth < SHARD_DEPTH {
                if path.is_dir() {
                    self.collect(&path, depth + 1, files)?;
                }
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(file) = parse_file_name(name, &path) {
                files.push(file);
            }
        }
        Ok(())
    }
}

fn parse_file_name(name: &str, path: &Path) -> Option<BinaryFile> {
    let (stem, compressed) = match name.strip_suffix(GZIP_EXTENSION) {
        Some(stem) => (stem, true),
        None => (name, false),
    };
    let key = BinaryKey::parse(stem.strip_suffix(DOCUMENT_EXTENSION)?)?;
    Some(BinaryFile {
        key,
        path: path.to_path_buf(),
        compressed,
    })
}
