//! # Key Enumeration Errors
//!
//! Enumeration errors are the only failures in this crate that propagate to
//! the caller: a silently partial key set would produce a silently partial
//! backup.

use thiserror::Error;

use super::MemberId;

/// Result type for key enumeration
pub type EnumerationResult<T> = Result<T, EnumerationError>;

/// Key enumeration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumerationError {
    /// The member task ran and reported a failure
    #[error("Key enumeration failed on member {member}: {reason}")]
    MemberFailed { member: MemberId, reason: String },

    /// The member task was cancelled before it produced keys
    #[error("Key enumeration was cancelled on member {member}")]
    MemberCancelled { member: MemberId },

    /// The member task panicked
    #[error("Key enumeration panicked on member {member}: {reason}")]
    MemberPanicked { member: MemberId, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_member() {
        let err = EnumerationError::MemberFailed {
            member: MemberId::new("node-b"),
            reason: "connection reset".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("node-b"));
        assert!(display.contains("connection reset"));
    }
}
