//! Change feed
//!
//! The repository publishes one [`ChangeSet`] per committed batch. Listeners
//! registered on a [`ChangeBus`] see every batch published while they are
//! registered.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::repository::{BinaryKey, NodeKey};

/// One binary usage transition inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Change {
    /// A property started referencing the binary
    BinaryValueUsed(BinaryKey),
    /// The last reference to the binary went away
    BinaryValueUnused(BinaryKey),
}

/// One committed batch of changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
    changed_nodes: Vec<NodeKey>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binary_used(mut self, key: BinaryKey) -> Self {
        self.changes.push(Change::BinaryValueUsed(key));
        self
    }

    pub fn binary_unused(mut self, key: BinaryKey) -> Self {
        self.changes.push(Change::BinaryValueUnused(key));
        self
    }

    pub fn node_changed(mut self, key: NodeKey) -> Self {
        self.changed_nodes.push(key);
        self
    }

    /// Binary transitions, in commit order
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Nodes written by this batch
    pub fn changed_nodes(&self) -> &[NodeKey] {
        &self.changed_nodes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.changed_nodes.is_empty()
    }
}

/// Receives committed change batches.
///
/// Called concurrently from repository threads.
pub trait ChangeSetListener: Send + Sync {
    fn notify(&self, changes: &ChangeSet);
}

/// Handle returned by [`ChangeBus::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Subscription point of the change feed.
pub trait ChangeBus: Send + Sync {
    fn register(&self, listener: Arc<dyn ChangeSetListener>) -> ListenerId;

    /// Returns false if `id` was not registered
    fn unregister(&self, id: ListenerId) -> bool;
}

/// In-process change bus.
///
/// Delivery is synchronous on the publishing thread.
#[derive(Default)]
pub struct MemoryChangeBus {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn ChangeSetListener>)>>,
    next_id: AtomicU64,
}

impl MemoryChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `changes` to every registered listener
    pub fn publish(&self, changes: &ChangeSet) {
        let listeners: Vec<Arc<dyn ChangeSetListener>> = match self.listeners.read() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };

        for listener in listeners {
            listener.notify(changes);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }
}

impl fmt::Debug for MemoryChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryChangeBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ChangeBus for MemoryChangeBus {
    fn register(&self, listener: Arc<dyn ChangeSetListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push((id, listener));
        }
        id
    }

    fn unregister(&self, id: ListenerId) -> bool {
        match self.listeners.write() {
            Ok(mut listeners) => {
                let before = listeners.len();
                listeners.retain(|(registered, _)| *registered != id);
                listeners.len() != before
            }
            Err(_) => false,
        }
    }
}
