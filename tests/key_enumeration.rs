//! Cluster-wide key enumeration tests

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use repovault::cache::{
    DistributedKeyEnumerator, EnumerationConfig, EnumerationError, KeyedCache, MemoryCache,
    StaticCluster,
};
use repovault::observability::{Diagnostics, Logger};
use repovault::repository::{MemoryDocumentStore, NodeKey};

fn sorted(mut keys: Vec<u32>) -> Vec<u32> {
    keys.sort_unstable();
    keys
}

#[tokio::test]
async fn test_union_with_one_slow_member() {
    let (logger, buffer) = Logger::buffered();
    let diagnostics = Diagnostics::new(logger);

    let cluster = StaticCluster::new()
        .member("n1", (0..50).collect())
        .slow_member("n2", (50..60).collect(), Duration::from_millis(150))
        .member("n3", (60..100).collect());
    let cache = MemoryCache::new("docs").with_cluster(Arc::new(cluster));

    let enumerator = DistributedKeyEnumerator::new(EnumerationConfig { poll_interval_ms: 25 })
        .with_diagnostics(diagnostics.clone());
    let keys = enumerator.enumerate_keys(&cache).collect_all().await.unwrap();

    assert_eq!(keys.len(), 100);
    assert_eq!(sorted(keys), (0..100).collect::<Vec<u32>>());

    // Members that finish early are drained before the slow one returns
    let lines = buffer.lines();
    let complete: Vec<&String> = lines
        .iter()
        .filter(|l| l.contains("ENUMERATION_MEMBER_COMPLETE"))
        .collect();
    assert_eq!(complete.len(), 3);
    assert!(complete[2].contains("n2"));

    let snapshot = diagnostics.metrics().snapshot();
    assert_eq!(snapshot.keys_enumerated, 100);
    assert_eq!(snapshot.member_tasks_completed, 3);
    assert_eq!(snapshot.member_tasks_failed, 0);
}

#[tokio::test]
async fn test_partitioned_document_store() {
    let keys: Vec<NodeKey> = (0..25).map(|i| NodeKey::new(format!("node-{}", i))).collect();
    let cluster = StaticCluster::partitioned(keys.clone(), 4);
    let store = MemoryDocumentStore::new().with_cluster(Arc::new(cluster));
    assert!(store.cluster().is_some());

    let found: HashSet<NodeKey> = DistributedKeyEnumerator::default()
        .enumerate_keys(&store)
        .collect_all()
        .await
        .unwrap()
        .into_iter()
        .collect();

    assert_eq!(found, keys.into_iter().collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_failure_does_not_hide_other_members() {
    let cluster = StaticCluster::new()
        .member("a", vec![1u32, 2])
        .failing_member("b", "member left the cluster")
        .member("c", vec![3u32]);
    let cache = MemoryCache::new("docs").with_cluster(Arc::new(cluster));

    let mut sequence = DistributedKeyEnumerator::default().enumerate_keys(&cache);
    let mut keys = Vec::new();
    let mut errors = Vec::new();
    loop {
        match sequence.next().await {
            Ok(Some(key)) => keys.push(key),
            Ok(None) => break,
            Err(err) => errors.push(err),
        }
    }

    assert_eq!(sorted(keys), vec![1, 2, 3]);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], EnumerationError::MemberFailed { .. }));
}

#[tokio::test]
async fn test_local_cache_makes_no_cluster_calls() {
    let cache = MemoryCache::new("local");
    for key in [5u32, 3, 9] {
        cache.insert(key);
    }

    let sequence = DistributedKeyEnumerator::default().enumerate_keys(&cache);
    assert!(!sequence.is_distributed());
    assert_eq!(sequence.collect_all().await.unwrap(), vec![5, 3, 9]);
}
