//! Document codec
//!
//! The backup core never looks inside a document. It hands each one to a
//! [`DocumentCodec`], appends [`RECORD_DELIMITER`], and on the way back asks
//! the codec for the next record in the stream.
//!
//! # Framing
//!
//! ```text
//! <record bytes>\n<record bytes>\n...
//! ```
//!
//! Encoders must never emit the delimiter inside a record. Compact JSON
//! escapes newlines inside strings, so [`JsonCodec`] satisfies this.

use std::io::{self, BufRead};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Byte written after every record
pub const RECORD_DELIMITER: u8 = b'\n';

/// Codec failures
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("truncated record ({0} bytes without delimiter)")]
    Truncated(usize),
}

impl CodecError {
    /// Whether the stream holds damaged data rather than failing to deliver it.
    ///
    /// Damaged data is recoverable by skipping to the next file; anything
    /// else means the storage itself is failing.
    pub fn is_corruption(&self) -> bool {
        match self {
            CodecError::Malformed(_) | CodecError::Truncated(_) => true,
            CodecError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput
            ),
        }
    }
}

/// Streaming multi-record encoder/decoder for one document type.
pub trait DocumentCodec: Send + Sync {
    type Document;

    /// Append the encoding of `document` to `out`, without the delimiter.
    fn encode(&self, document: &Self::Document, out: &mut Vec<u8>) -> Result<(), CodecError>;

    /// Decode the next record.
    ///
    /// Returns `Ok(None)` at a clean end of stream.
    fn decode(&self, input: &mut dyn BufRead) -> Result<Option<Self::Document>, CodecError>;
}

/// One JSON value per line, via serde.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T> DocumentCodec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    type Document = T;

    fn encode(&self, document: &T, out: &mut Vec<u8>) -> Result<(), CodecError> {
        serde_json::to_writer(out, document).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn decode(&self, input: &mut dyn BufRead) -> Result<Option<T>, CodecError> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = input.read_until(RECORD_DELIMITER, &mut line)?;
            if read == 0 {
                return Ok(None);
            }
            if line.last() != Some(&RECORD_DELIMITER) {
                return Err(CodecError::Truncated(line.len()));
            }

            let record = &line[..line.len() - 1];
            if record.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return serde_json::from_slice(record)
                .map(Some)
                .map_err(|e| CodecError::Malformed(e.to_string()));
        }
    }
}
