//! Key enumeration configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backup::{BackupError, BackupResult};

/// Tuning for cluster-wide key enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationConfig {
    /// Upper bound on one wait round over outstanding member tasks.
    ///
    /// This is not a deadline: a round that elapses is logged and the wait
    /// starts again. Callers needing a hard cap wrap the whole enumeration
    /// in their own timeout.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl EnumerationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> BackupResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(BackupError::invalid_argument(
                "poll_interval_ms must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_interval() {
        let config = EnumerationConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = EnumerationConfig { poll_interval_ms: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_field_uses_default() {
        let config: EnumerationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.poll_interval_ms, 100);
    }
}
