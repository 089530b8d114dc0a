//! Lazy key sequences

use std::hash::Hash;

use crate::observability::Diagnostics;

use super::distributed::DistributedKeys;
use super::errors::EnumerationResult;

/// Keys produced by a local iterator, no cluster involved.
pub struct LocalKeys<K> {
    iter: Box<dyn Iterator<Item = K> + Send>,
    diagnostics: Diagnostics,
}

impl<K> LocalKeys<K> {
    pub(crate) fn new(iter: Box<dyn Iterator<Item = K> + Send>, diagnostics: Diagnostics) -> Self {
        Self { iter, diagnostics }
    }

    fn next(&mut self) -> Option<K> {
        let key = self.iter.next();
        if key.is_some() {
            self.diagnostics.metrics().increment_keys_enumerated();
        }
        key
    }
}

/// A finite, lazily produced sequence of cache keys.
///
/// Obtained from
/// [`DistributedKeyEnumerator::enumerate_keys`](super::DistributedKeyEnumerator::enumerate_keys).
pub enum KeySequence<K> {
    /// Keys of a cache that is not distributed
    Local(LocalKeys<K>),
    /// Keys merged from every member of a cluster
    Distributed(DistributedKeys<K>),
}

impl<K> KeySequence<K>
where
    K: Clone + Eq + Hash + Send + 'static,
{
    /// Pull the next key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(key))` for the next key
    /// - `Ok(None)` once every source is exhausted
    /// - `Err` if a member task failed; that member is dropped from the
    ///   sequence, so further calls continue with the remaining members
    pub async fn next(&mut self) -> EnumerationResult<Option<K>> {
        match self {
            KeySequence::Local(keys) => Ok(keys.next()),
            KeySequence::Distributed(keys) => keys.next().await,
        }
    }

    /// Drain the whole sequence, stopping at the first error.
    pub async fn collect_all(mut self) -> EnumerationResult<Vec<K>> {
        let mut keys = Vec::new();
        while let Some(key) = self.next().await? {
            keys.push(key);
        }
        Ok(keys)
    }

    /// Whether this sequence merges results from a cluster
    pub fn is_distributed(&self) -> bool {
        matches!(self, KeySequence::Distributed(_))
    }
}
