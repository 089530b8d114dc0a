//! Problem log
//!
//! Writers, readers and the service report non-fatal failures here instead of
//! returning them. The caller inspects the log after a run and decides
//! whether the run succeeded.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::observability::{Diagnostics, Event};

use super::errors::{BackupError, BackupErrorCode, Severity};

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub severity: Severity,
    pub code: BackupErrorCode,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// Thread-safe, cloneable collection of problems.
///
/// Clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct ProblemLog {
    problems: Arc<Mutex<Vec<Problem>>>,
    diagnostics: Diagnostics,
}

impl ProblemLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that also emits `PROBLEM_RECORDED` for every entry
    pub fn with_diagnostics(diagnostics: Diagnostics) -> Self {
        Self {
            problems: Arc::default(),
            diagnostics,
        }
    }

    /// Record a failure.
    pub fn record(&self, error: BackupError) {
        let problem = Problem {
            severity: error.severity(),
            code: error.code(),
            message: error.detail(),
            recorded_at: Utc::now(),
        };

        self.diagnostics.metrics().increment_problems();
        self.diagnostics.event(
            Event::ProblemRecorded,
            &[
                ("code", problem.code.as_str()),
                ("message", problem.message.as_str()),
            ],
        );

        if let Ok(mut problems) = self.problems.lock() {
            problems.push(problem);
        }
    }

    /// Snapshot of everything recorded so far, in order
    pub fn problems(&self) -> Vec<Problem> {
        self.problems
            .lock()
            .map(|problems| problems.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.problems.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any entry has `Error` severity
    pub fn has_errors(&self) -> bool {
        self.problems
            .lock()
            .map(|problems| problems.iter().any(|p| p.severity == Severity::Error))
            .unwrap_or(false)
    }

    /// Whether any entry carries `code`
    pub fn contains(&self, code: BackupErrorCode) -> bool {
        self.problems
            .lock()
            .map(|problems| problems.iter().any(|p| p.code == code))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Logger;

    #[test]
    fn test_clones_share_entries() {
        let log = ProblemLog::new();
        let clone = log.clone();

        clone.record(BackupError::corrupt("file 2 truncated"));
        assert_eq!(log.len(), 1);
        assert!(!log.has_errors());
        assert!(log.contains(BackupErrorCode::RepovaultBackupCorrupt));

        log.record(BackupError::write_failed("disk full", None));
        assert!(clone.has_errors());
        assert_eq!(clone.problems().len(), 2);
    }

    #[test]
    fn test_records_are_logged_and_counted() {
        let (logger, buffer) = Logger::buffered();
        let diagnostics = Diagnostics::new(logger);
        let log = ProblemLog::with_diagnostics(diagnostics.clone());

        log.record(BackupError::read_failed("unreadable", None));

        assert_eq!(buffer.events_named("PROBLEM_RECORDED").len(), 1);
        assert_eq!(diagnostics.metrics().snapshot().problems_recorded, 1);
        let problem = &log.problems()[0];
        assert_eq!(problem.code, BackupErrorCode::RepovaultBackupReadFailed);
        assert_eq!(
            problem.to_string(),
            "[ERROR] REPOVAULT_BACKUP_READ_FAILED: unreadable"
        );
    }

    #[test]
    fn test_message_keeps_cause() {
        let log = ProblemLog::new();
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        log.record(BackupError::write_failed("failed to write run_01.bin", Some(cause)));

        assert_eq!(
            log.problems()[0].message,
            "failed to write run_01.bin (caused by: disk full)"
        );
    }
}
