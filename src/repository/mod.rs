//! Repository collaborators
//!
//! The backup service reads from and writes back into a repository through
//! two stores:
//!
//! - [`DocumentStore`]: node documents, enumerable as a [`KeyedCache`]
//! - [`BinaryStore`]: content-addressed binary values with usage marks
//!
//! The in-memory implementations back the CLI, the tests and embedders that
//! keep their repository in process.

mod errors;
mod keys;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use keys::{BinaryKey, NodeKey};
pub use memory::{MemoryBinaryStore, MemoryDocumentStore};

use serde::{Deserialize, Serialize};

use crate::cache::KeyedCache;

/// Key of the document describing the repository itself
pub const DEFAULT_METADATA_KEY: &str = "repository:metadata";

/// One node document as stored and backed up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub key: NodeKey,
    pub content: serde_json::Value,
}

impl NodeDocument {
    pub fn new(key: impl Into<NodeKey>, content: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            content,
        }
    }
}

/// Node document storage.
pub trait DocumentStore: KeyedCache<NodeKey> {
    fn get(&self, key: &NodeKey) -> StoreResult<Option<NodeDocument>>;

    /// Insert or replace
    fn put(&self, document: NodeDocument) -> StoreResult<()>;

    /// Returns false if nothing was stored under `key`
    fn remove(&self, key: &NodeKey) -> StoreResult<bool>;

    /// Remove every document.
    ///
    /// Stores that cannot clear in one step return
    /// [`StoreError::Unsupported`]; callers then remove key by key.
    fn clear(&self) -> StoreResult<()>;

    /// Key of the repository metadata document
    fn metadata_key(&self) -> NodeKey;
}

/// Content-addressed binary storage.
pub trait BinaryStore: Send + Sync {
    fn all_binary_keys(&self) -> StoreResult<Vec<BinaryKey>>;

    fn read(&self, key: &BinaryKey) -> StoreResult<Vec<u8>>;

    /// Store `content`, returning its key
    fn store(&self, content: &[u8]) -> StoreResult<BinaryKey>;

    fn mark_as_unused(&self, keys: &[BinaryKey]) -> StoreResult<()>;
}
