//! Binary usage tracking tests
//!
//! A key must never end up both used and unused, whatever order its
//! transitions arrive in and however many threads deliver them.

use std::sync::Arc;

use repovault::repository::{BinaryKey, NodeKey};
use repovault::usage::{ChangeBus, ChangeSet, ChangeSetListener, MemoryChangeBus, UsageTracker};

fn key(name: &str) -> BinaryKey {
    BinaryKey::for_content(name.as_bytes())
}

fn assert_disjoint(tracker: &UsageTracker) {
    let used = tracker.used_binary_keys();
    let unused = tracker.unused_binary_keys();
    assert!(used.is_disjoint(&unused), "used {:?} unused {:?}", used, unused);
}

#[test]
fn test_every_sequence_of_six_transitions_stays_disjoint() {
    let k = key("k");
    for mask in 0u32..64 {
        let (tracker, _rx) = UsageTracker::channel();
        let mut changes = ChangeSet::new();
        for bit in 0..6 {
            changes = if mask & (1 << bit) != 0 {
                changes.binary_used(k.clone())
            } else {
                changes.binary_unused(k.clone())
            };
        }
        tracker.notify(&changes);
        assert_disjoint(&tracker);
    }
}

#[test]
fn test_used_then_unused_cancels() {
    let (tracker, _rx) = UsageTracker::channel();
    tracker.notify(&ChangeSet::new().binary_used(key("k")));
    tracker.notify(&ChangeSet::new().binary_unused(key("k")));

    assert!(tracker.used_binary_keys().is_empty());
    assert!(tracker.unused_binary_keys().is_empty());
}

#[test]
fn test_one_transition_per_batch_stays_disjoint() {
    let k = key("k");
    for mask in 0u32..64 {
        let (tracker, _rx) = UsageTracker::channel();
        for bit in 0..6 {
            let batch = if mask & (1 << bit) != 0 {
                ChangeSet::new().binary_used(k.clone())
            } else {
                ChangeSet::new().binary_unused(k.clone())
            };
            tracker.notify(&batch);
            assert_disjoint(&tracker);
        }
    }
}

#[test]
fn test_contradiction_does_not_cut_batch_short() {
    let (tracker, _rx) = UsageTracker::channel();
    let batch = ChangeSet::new()
        .binary_used(key("a"))
        .binary_unused(key("a"))
        .binary_unused(key("b"))
        .binary_used(key("c"));
    tracker.notify(&batch);

    assert!(tracker.used_binary_keys().contains(&key("c")));
    assert!(tracker.unused_binary_keys().contains(&key("b")));
    assert!(!tracker.used_binary_keys().contains(&key("a")));
    assert!(!tracker.unused_binary_keys().contains(&key("a")));
}

#[test]
fn test_concurrent_notifiers() {
    let (tracker, mut rx) = UsageTracker::channel();
    let tracker = Arc::new(tracker);
    let bus = MemoryChangeBus::new();
    bus.register(tracker.clone());

    std::thread::scope(|scope| {
        for t in 0..8 {
            let bus = &bus;
            scope.spawn(move || {
                for i in 0..200 {
                    let shared = key(&format!("shared-{}", i % 10));
                    let own = key(&format!("own-{}-{}", t, i));
                    let batch = if (t + i) % 2 == 0 {
                        ChangeSet::new().binary_used(shared)
                    } else {
                        ChangeSet::new().binary_unused(shared)
                    };
                    let batch = batch
                        .binary_used(own)
                        .node_changed(NodeKey::new(format!("node-{}-{}", t, i)));
                    bus.publish(&batch);
                }
            });
        }
    });

    assert_disjoint(&tracker);
    let shared: Vec<BinaryKey> = (0..10).map(|i| key(&format!("shared-{}", i))).collect();
    let own_used = tracker
        .used_binary_keys()
        .into_iter()
        .filter(|k| !shared.contains(k))
        .count();
    assert_eq!(own_used, 8 * 200);

    tracker.stop_forwarding();
    let mut forwarded = 0;
    while rx.try_recv().is_ok() {
        forwarded += 1;
    }
    assert_eq!(forwarded, 8 * 200);
}

#[test]
fn test_nothing_forwarded_after_stop() {
    let (tracker, mut rx) = UsageTracker::channel();
    tracker.notify(&ChangeSet::new().node_changed(NodeKey::new("before")));
    tracker.stop_forwarding();
    tracker.notify(&ChangeSet::new().node_changed(NodeKey::new("after")));

    assert_eq!(rx.try_recv().unwrap(), NodeKey::new("before"));
    assert!(rx.try_recv().is_err());
}
