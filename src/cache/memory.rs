//! In-process cache and cluster implementations
//!
//! `MemoryCache` holds keys in memory. `StaticCluster` stands in for a real
//! cluster: each member owns a fixed key list and may answer late or fail,
//! which is enough to drive the merging logic end to end.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::errors::EnumerationError;
use super::{ClusterExecutor, KeyedCache, MemberId, MemberTask};

/// A keyed cache backed by an in-memory list.
pub struct MemoryCache<K> {
    name: String,
    keys: RwLock<Vec<K>>,
    cluster: Option<Arc<dyn ClusterExecutor<K>>>,
}

impl<K> MemoryCache<K>
where
    K: Clone + PartialEq + Send + Sync + 'static,
{
    /// An empty, local-only cache
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: RwLock::new(Vec::new()),
            cluster: None,
        }
    }

    /// Mark this cache as distributed over `cluster`
    pub fn with_cluster(mut self, cluster: Arc<dyn ClusterExecutor<K>>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Add a key; duplicates are ignored
    pub fn insert(&self, key: K) {
        if let Ok(mut keys) = self.keys.write() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    pub fn remove(&self, key: &K) {
        if let Ok(mut keys) = self.keys.write() {
            keys.retain(|k| k != key);
        }
    }

    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> KeyedCache<K> for MemoryCache<K>
where
    K: Clone + PartialEq + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn local_keys(&self) -> Box<dyn Iterator<Item = K> + Send> {
        let snapshot = self.keys.read().map(|keys| keys.clone()).unwrap_or_default();
        Box::new(snapshot.into_iter())
    }

    fn cluster(&self) -> Option<Arc<dyn ClusterExecutor<K>>> {
        self.cluster.clone()
    }
}

/// Behaviour of one simulated member
#[derive(Debug, Clone)]
struct StaticMember<K> {
    id: MemberId,
    keys: Vec<K>,
    delay: Duration,
    failure: Option<String>,
}

/// A fixed set of members, each answering enumeration from its own key list.
#[derive(Debug, Clone)]
pub struct StaticCluster<K> {
    members: Vec<StaticMember<K>>,
}

impl<K> Default for StaticCluster<K> {
    fn default() -> Self {
        Self { members: Vec::new() }
    }
}

impl<K> StaticCluster<K>
where
    K: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// A member that answers immediately
    pub fn member(self, id: &str, keys: Vec<K>) -> Self {
        self.push(id, keys, Duration::ZERO, None)
    }

    /// A member that answers after `delay`
    pub fn slow_member(self, id: &str, keys: Vec<K>, delay: Duration) -> Self {
        self.push(id, keys, delay, None)
    }

    /// A member whose task fails with `reason`
    pub fn failing_member(self, id: &str, reason: &str) -> Self {
        self.push(id, Vec::new(), Duration::ZERO, Some(reason.to_string()))
    }

    /// Split `keys` round-robin across `count` immediately answering members
    /// with random identities.
    pub fn partitioned(keys: Vec<K>, count: usize) -> Self {
        let count = count.max(1);
        let mut shares: Vec<Vec<K>> = vec![Vec::new(); count];
        for (i, key) in keys.into_iter().enumerate() {
            shares[i % count].push(key);
        }

        let mut cluster = Self::new();
        for share in shares {
            cluster = cluster.push(MemberId::random().as_str(), share, Duration::ZERO, None);
        }
        cluster
    }

    fn push(mut self, id: &str, keys: Vec<K>, delay: Duration, failure: Option<String>) -> Self {
        self.members.push(StaticMember {
            id: MemberId::new(id),
            keys,
            delay,
            failure,
        });
        self
    }
}

impl<K> ClusterExecutor<K> for StaticCluster<K>
where
    K: Clone + Send + Sync + 'static,
{
    fn submit_everywhere(&self, _cache_name: &str) -> Vec<MemberTask<K>> {
        self.members
            .iter()
            .cloned()
            .map(|member| {
                let id = member.id.clone();
                let handle = tokio::spawn(async move {
                    if !member.delay.is_zero() {
                        tokio::time::sleep(member.delay).await;
                    }
                    match member.failure {
                        Some(reason) => Err(EnumerationError::MemberFailed {
                            member: member.id,
                            reason,
                        }),
                        None => Ok(member.keys),
                    }
                });
                MemberTask { member: id, handle }
            })
            .collect()
    }
}
