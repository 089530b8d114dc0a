//! Live change observation during a backup
//!
//! While a backup runs the repository keeps committing. A [`UsageTracker`]
//! registered on the [`ChangeBus`] records which binaries became used or
//! unused, and queues every changed node so the backup can capture its latest
//! state.

mod changes;
mod tracker;

pub use changes::{Change, ChangeBus, ChangeSet, ChangeSetListener, ListenerId, MemoryChangeBus};
pub use tracker::UsageTracker;
