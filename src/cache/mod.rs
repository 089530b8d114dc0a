//! Key enumeration over local or clustered caches
//!
//! A backup needs every key a cache holds. When the cache lives in one
//! process that is a plain iterator; when it is spread across a cluster,
//! every member must enumerate its own share and the results must be merged
//! without letting one slow member hold back the keys of the others.
//!
//! # Components
//!
//! - [`KeyedCache`]: a cache that can list its local keys and, when
//!   distributed, exposes a [`ClusterExecutor`]
//! - [`ClusterExecutor`]: broadcasts one enumeration task to every member
//! - [`DistributedKeyEnumerator`]: picks the local or cluster path
//! - [`KeySequence`]: the lazy, duplicate-free key stream handed back
//!
//! # Guarantees
//!
//! - Keys are never returned twice
//! - Keys from one member keep that member's order
//! - No ordering across members
//! - A failed member surfaces as an error from [`KeySequence::next`]

mod config;
mod distributed;
mod errors;
mod memory;
mod sequence;

pub use config::EnumerationConfig;
pub use distributed::{DistributedKeyEnumerator, DistributedKeys};
pub use errors::{EnumerationError, EnumerationResult};
pub use memory::{MemoryCache, StaticCluster};
pub use sequence::{KeySequence, LocalKeys};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// Identity of one cluster member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random member identity
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One outstanding per-member enumeration.
///
/// The handle resolves to the keys that member holds, in the order the
/// member produced them.
pub struct MemberTask<K> {
    pub member: MemberId,
    pub handle: JoinHandle<EnumerationResult<Vec<K>>>,
}

impl<K> fmt::Debug for MemberTask<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberTask")
            .field("member", &self.member)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

/// Runs enumeration tasks on cluster members.
pub trait ClusterExecutor<K>: Send + Sync {
    /// Submit one key enumeration task for `cache_name` to every member.
    ///
    /// Must be called from within a tokio runtime; each task is spawned
    /// immediately and runs in parallel with the others.
    fn submit_everywhere(&self, cache_name: &str) -> Vec<MemberTask<K>>;
}

/// A cache whose keys can be enumerated.
pub trait KeyedCache<K>: Send + Sync {
    /// Cache name, used for task routing and diagnostics
    fn name(&self) -> &str;

    /// Keys held by this process
    fn local_keys(&self) -> Box<dyn Iterator<Item = K> + Send>;

    /// The cluster this cache is distributed over, or `None` for a
    /// local-only cache
    fn cluster(&self) -> Option<Arc<dyn ClusterExecutor<K>>>;
}
