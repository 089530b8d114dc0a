//! Observability subsystem for repovault
//!
//! This module provides:
//! - Structured logging (JSON lines)
//! - Monotonic operational counters
//! - Typed lifecycle events
//! - Scope-based begin/complete logging
//!
//! # Principles
//!
//! 1. Observability is read-only: no side effects on backup or restore
//! 2. Nothing is ambient: components receive a [`Diagnostics`] handle
//! 3. Disabled by default
//!
//! # Usage
//!
//! ```ignore
//! use repovault::observability::{Diagnostics, Event, Logger};
//!
//! let diagnostics = Diagnostics::new(Logger::console());
//! diagnostics.event(Event::BackupContentWritten, &[("dir", "/var/backups/run1")]);
//! diagnostics.metrics().increment_documents_written();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{LogBuffer, Logger, Severity};
pub use metrics::{BackupMetrics, MetricsSnapshot};
pub use scope::ObservationScope;

use std::sync::Arc;

/// Logger plus counters, injected into every component.
///
/// Cloning is cheap; clones share the sink and the counters.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    logger: Logger,
    metrics: Arc<BackupMetrics>,
}

impl Diagnostics {
    /// Diagnostics logging through `logger` with fresh counters
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            metrics: Arc::new(BackupMetrics::new()),
        }
    }

    /// Diagnostics that log nothing; counters still accumulate
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Replace the counters with a shared registry
    pub fn with_metrics(mut self, metrics: Arc<BackupMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn metrics(&self) -> &BackupMetrics {
        &self.metrics
    }

    /// Log a lifecycle event; failure events go out at WARN
    pub fn event(&self, event: Event, fields: &[(&str, &str)]) {
        let severity = if event.is_failure() {
            Severity::Warn
        } else {
            Severity::Info
        };
        self.logger.log(severity, event.as_str(), fields);
    }

    /// Log a lifecycle event at TRACE
    pub fn trace(&self, event: Event, fields: &[(&str, &str)]) {
        self.logger.trace(event.as_str(), fields);
    }
}
