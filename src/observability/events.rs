//! Observability events for repovault
//!
//! Events are explicit and typed. Each maps to one stable upper-case name
//! used as the `event` field of a log line.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Backup run
    /// Content area written
    BackupContentWritten,
    /// Binary area written
    BackupBinariesWritten,
    /// Changed documents drained to the change area
    BackupChangesDrained,

    // Backup files
    /// A new backup file was opened for writing
    BackupFileOpened,
    /// A backup file was closed
    BackupFileClosed,

    // Restore run
    /// Documents replayed from one area
    RestoreDocumentsReplayed,

    // Restore files
    /// A backup file was opened for reading
    RestoreFileOpened,
    /// A corrupt backup file was abandoned
    RestoreFileSkipped,

    // Key enumeration
    /// Enumeration dispatched to the cluster
    EnumerationStart,
    /// One member returned its key set
    EnumerationMemberComplete,
    /// One member task failed
    EnumerationMemberFailed,
    /// A wait round elapsed with members still outstanding
    EnumerationWaiting,

    // Usage tracking
    /// Usage observer registered on the change bus
    UsageWindowOpened,
    /// Usage observer unregistered
    UsageWindowClosed,

    // Diagnostics
    /// A non-fatal problem was recorded
    ProblemRecorded,
    /// Configuration loaded
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BackupContentWritten => "BACKUP_CONTENT_WRITTEN",
            Event::BackupBinariesWritten => "BACKUP_BINARIES_WRITTEN",
            Event::BackupChangesDrained => "BACKUP_CHANGES_DRAINED",

            Event::BackupFileOpened => "BACKUP_FILE_OPENED",
            Event::BackupFileClosed => "BACKUP_FILE_CLOSED",

            Event::RestoreDocumentsReplayed => "RESTORE_DOCUMENTS_REPLAYED",

            Event::RestoreFileOpened => "RESTORE_FILE_OPENED",
            Event::RestoreFileSkipped => "RESTORE_FILE_SKIPPED",

            Event::EnumerationStart => "ENUMERATION_BEGIN",
            Event::EnumerationMemberComplete => "ENUMERATION_MEMBER_COMPLETE",
            Event::EnumerationMemberFailed => "ENUMERATION_MEMBER_FAILED",
            Event::EnumerationWaiting => "ENUMERATION_WAITING",

            Event::UsageWindowOpened => "USAGE_WINDOW_OPENED",
            Event::UsageWindowClosed => "USAGE_WINDOW_CLOSED",

            Event::ProblemRecorded => "PROBLEM_RECORDED",
            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::RestoreFileSkipped | Event::EnumerationMemberFailed | Event::ProblemRecorded
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
