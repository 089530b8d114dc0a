//! Binary usage tracking during a backup window
//!
//! # Algorithm
//!
//! For every change in a batch:
//! - `BinaryValueUnused(k)`: if `k` is in `used`, remove it and move on to
//!   the next change; otherwise add `k` to `unused`
//! - `BinaryValueUsed(k)`: symmetric against `unused`
//!
//! Every node key in the batch is forwarded to the changed-node queue.
//!
//! # Invariants
//!
//! - A key is never in both `used` and `unused`
//! - Every change of every batch is processed; a contradiction never cuts a
//!   batch short
//! - Both sets sit behind one lock, so a move between them is atomic

use std::collections::BTreeSet;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::observability::{Diagnostics, Event};
use crate::repository::{BinaryKey, NodeKey};

use super::changes::{Change, ChangeSet, ChangeSetListener};

#[derive(Debug, Default)]
struct UsageState {
    used: BTreeSet<BinaryKey>,
    unused: BTreeSet<BinaryKey>,
}

/// Change listener recording binary usage transitions and changed nodes.
#[derive(Debug)]
pub struct UsageTracker {
    state: Mutex<UsageState>,
    changed_nodes: Mutex<Option<mpsc::UnboundedSender<NodeKey>>>,
    diagnostics: Diagnostics,
}

impl UsageTracker {
    /// A tracker forwarding changed node keys to `changed_nodes`
    pub fn new(changed_nodes: mpsc::UnboundedSender<NodeKey>) -> Self {
        Self {
            state: Mutex::new(UsageState::default()),
            changed_nodes: Mutex::new(Some(changed_nodes)),
            diagnostics: Diagnostics::disabled(),
        }
    }

    /// A tracker together with the receiving end of its node queue
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NodeKey>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Binaries that became used during the window
    pub fn used_binary_keys(&self) -> BTreeSet<BinaryKey> {
        self.state
            .lock()
            .map(|state| state.used.clone())
            .unwrap_or_default()
    }

    /// Binaries that became unused during the window
    pub fn unused_binary_keys(&self) -> BTreeSet<BinaryKey> {
        self.state
            .lock()
            .map(|state| state.unused.clone())
            .unwrap_or_default()
    }

    /// Stop forwarding node keys.
    ///
    /// Drops the sender, so the consumer sees the queue close once it has
    /// drained what is already there.
    pub fn stop_forwarding(&self) {
        let closed = match self.changed_nodes.lock() {
            Ok(mut sender) => sender.take().is_some(),
            Err(_) => false,
        };
        if closed {
            self.diagnostics.event(Event::UsageWindowClosed, &[]);
        }
    }

    fn record(&self, changes: &[Change]) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        for change in changes {
            match change {
                Change::BinaryValueUnused(key) => {
                    if state.used.remove(key) {
                        continue;
                    }
                    state.unused.insert(key.clone());
                }
                Change::BinaryValueUsed(key) => {
                    if state.unused.remove(key) {
                        continue;
                    }
                    state.used.insert(key.clone());
                }
            }
        }

        self.diagnostics
            .metrics()
            .add_usage_transitions(changes.len() as u64);
    }

    fn forward(&self, nodes: &[NodeKey]) {
        if nodes.is_empty() {
            return;
        }
        let Ok(sender) = self.changed_nodes.lock() else {
            return;
        };
        if let Some(sender) = sender.as_ref() {
            for node in nodes {
                // A closed receiver means nobody wants the keys any more
                if sender.send(node.clone()).is_err() {
                    break;
                }
            }
        }
    }
}

impl ChangeSetListener for UsageTracker {
    fn notify(&self, changes: &ChangeSet) {
        self.record(changes.changes());
        self.forward(changes.changed_nodes());
    }
}
