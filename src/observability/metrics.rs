//! Backup counters
//!
//! - Counters only, monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters for backup, restore, and enumeration.
///
/// All counters use Relaxed ordering; readers only need eventually
/// consistent totals.
#[derive(Debug, Default)]
pub struct BackupMetrics {
    /// Documents handed to any writer
    documents_written: AtomicU64,
    /// Backup files opened for writing
    files_written: AtomicU64,
    /// Documents returned by any reader
    documents_read: AtomicU64,
    /// Backup files opened for reading
    files_read: AtomicU64,
    /// Corrupt files skipped while reading
    read_recoveries: AtomicU64,
    /// Problems recorded in any problem log
    problems_recorded: AtomicU64,
    /// Keys produced by key sequences
    keys_enumerated: AtomicU64,
    /// Member enumeration tasks that finished successfully
    member_tasks_completed: AtomicU64,
    /// Member enumeration tasks that failed
    member_tasks_failed: AtomicU64,
    /// Binary usage transitions observed
    usage_transitions: AtomicU64,
}

impl BackupMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_documents_written(&self) {
        self.documents_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_written(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_documents_read(&self) {
        self.documents_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_read(&self) {
        self.files_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_read_recoveries(&self) {
        self.read_recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_problems(&self) {
        self.problems_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_keys_enumerated(&self) {
        self.keys_enumerated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_member_tasks_completed(&self) {
        self.member_tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_member_tasks_failed(&self) {
        self.member_tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_usage_transitions(&self, count: u64) {
        self.usage_transitions.fetch_add(count, Ordering::Relaxed);
    }

    /// Current values as a compact JSON object
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"documents_written":{},"files_written":{},"documents_read":{},"files_read":{},"read_recoveries":{},"problems_recorded":{},"keys_enumerated":{},"member_tasks_completed":{},"member_tasks_failed":{},"usage_transitions":{}}}"#,
            s.documents_written,
            s.files_written,
            s.documents_read,
            s.files_read,
            s.read_recoveries,
            s.problems_recorded,
            s.keys_enumerated,
            s.member_tasks_completed,
            s.member_tasks_failed,
            s.usage_transitions,
        )
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_written: self.documents_written.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            documents_read: self.documents_read.load(Ordering::Relaxed),
            files_read: self.files_read.load(Ordering::Relaxed),
            read_recoveries: self.read_recoveries.load(Ordering::Relaxed),
            problems_recorded: self.problems_recorded.load(Ordering::Relaxed),
            keys_enumerated: self.keys_enumerated.load(Ordering::Relaxed),
            member_tasks_completed: self.member_tasks_completed.load(Ordering::Relaxed),
            member_tasks_failed: self.member_tasks_failed.load(Ordering::Relaxed),
            usage_transitions: self.usage_transitions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub documents_written: u64,
    pub files_written: u64,
    pub documents_read: u64,
    pub files_read: u64,
    pub read_recoveries: u64,
    pub problems_recorded: u64,
    pub keys_enumerated: u64,
    pub member_tasks_completed: u64,
    pub member_tasks_failed: u64,
    pub usage_transitions: u64,
}
