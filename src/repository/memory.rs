//! In-memory stores

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::cache::{ClusterExecutor, KeyedCache};

use super::errors::{StoreError, StoreResult};
use super::keys::{BinaryKey, NodeKey};
use super::{BinaryStore, DocumentStore, NodeDocument, DEFAULT_METADATA_KEY};

const DOCUMENT_CACHE_NAME: &str = "documents";

/// Node documents in a sorted map.
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<NodeKey, NodeDocument>>,
    metadata_key: NodeKey,
    cluster: Option<Arc<dyn ClusterExecutor<NodeKey>>>,
    supports_clear: bool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            metadata_key: NodeKey::new(DEFAULT_METADATA_KEY),
            cluster: None,
            supports_clear: true,
        }
    }

    /// Enumerate keys through `cluster` instead of the local map
    pub fn with_cluster(mut self, cluster: Arc<dyn ClusterExecutor<NodeKey>>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Make [`DocumentStore::clear`] report itself unsupported
    pub fn without_clear(mut self) -> Self {
        self.supports_clear = false;
        self
    }

    pub fn keys(&self) -> Vec<NodeKey> {
        self.documents
            .read()
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("document map lock poisoned".to_string())
    }
}

impl fmt::Debug for MemoryDocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocumentStore")
            .field("documents", &self.len())
            .field("distributed", &self.cluster.is_some())
            .finish()
    }
}

impl KeyedCache<NodeKey> for MemoryDocumentStore {
    fn name(&self) -> &str {
        DOCUMENT_CACHE_NAME
    }

    fn local_keys(&self) -> Box<dyn Iterator<Item = NodeKey> + Send> {
        Box::new(self.keys().into_iter())
    }

    fn cluster(&self) -> Option<Arc<dyn ClusterExecutor<NodeKey>>> {
        self.cluster.clone()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, key: &NodeKey) -> StoreResult<Option<NodeDocument>> {
        let docs = self.documents.read().map_err(|_| Self::poisoned())?;
        Ok(docs.get(key).cloned())
    }

    fn put(&self, document: NodeDocument) -> StoreResult<()> {
        let mut docs = self.documents.write().map_err(|_| Self::poisoned())?;
        docs.insert(document.key.clone(), document);
        Ok(())
    }

    fn remove(&self, key: &NodeKey) -> StoreResult<bool> {
        let mut docs = self.documents.write().map_err(|_| Self::poisoned())?;
        Ok(docs.remove(key).is_some())
    }

    fn clear(&self) -> StoreResult<()> {
        if !self.supports_clear {
            return Err(StoreError::Unsupported("clear"));
        }
        let mut docs = self.documents.write().map_err(|_| Self::poisoned())?;
        docs.clear();
        Ok(())
    }

    fn metadata_key(&self) -> NodeKey {
        self.metadata_key.clone()
    }
}

#[derive(Debug, Default)]
struct BinaryState {
    values: BTreeMap<BinaryKey, Vec<u8>>,
    unused: BTreeSet<BinaryKey>,
}

/// Binary values keyed by content hash.
#[derive(Debug, Default)]
pub struct MemoryBinaryStore {
    state: RwLock<BinaryState>,
}

impl MemoryBinaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &BinaryKey) -> bool {
        self.state
            .read()
            .map(|state| state.values.contains_key(key))
            .unwrap_or(false)
    }

    pub fn is_unused(&self, key: &BinaryKey) -> bool {
        self.state
            .read()
            .map(|state| state.unused.contains(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|state| state.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("binary map lock poisoned".to_string())
    }
}

impl BinaryStore for MemoryBinaryStore {
    fn all_binary_keys(&self) -> StoreResult<Vec<BinaryKey>> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.values.keys().cloned().collect())
    }

    fn read(&self, key: &BinaryKey) -> StoreResult<Vec<u8>> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        state
            .values
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Storing a value makes it used again
    fn store(&self, content: &[u8]) -> StoreResult<BinaryKey> {
        let key = BinaryKey::for_content(content);
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        state.values.insert(key.clone(), content.to_vec());
        state.unused.remove(&key);
        Ok(key)
    }

    /// Keys not in the store are ignored
    fn mark_as_unused(&self, keys: &[BinaryKey]) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        for key in keys {
            if state.values.contains_key(key) {
                state.unused.insert(key.clone());
            }
        }
        Ok(())
    }
}
