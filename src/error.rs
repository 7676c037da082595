//! Error types for the treesync library
//!
//! This module defines all error types that can occur during reconciliation
//! operations. Per-file transfer failures are deliberately *not* errors at
//! this level: they are counted in [`TransferStats`](crate::types::TransferStats)
//! so that a run always returns complete statistics. The variants here cover
//! the conditions that are fatal to a single rule invocation.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the treesync library
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for all treesync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rule references a desktop source that does not exist
    #[error("Source not found: {0:?}")]
    SourceNotFound(PathBuf),

    /// Rule is missing a required field or carries an unusable value
    #[error("Invalid rule {rule_id}: {reason}")]
    InvalidRule {
        /// Identifier of the offending rule
        rule_id: String,
        /// What was wrong with it
        reason: String,
    },

    /// Conflict resolution gave up after the bounded probe count
    #[error("No free destination name for {name:?} after {probes} attempts")]
    ConflictProbesExhausted {
        /// Candidate name that could not be placed
        name: String,
        /// Number of rename candidates that were tried
        probes: u32,
    },

    /// Persisted rule state could not be written
    #[error("State store error: {0}")]
    StateStore(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Create a state store error with a custom message
    pub fn state_store(msg: impl Into<String>) -> Self {
        SyncError::StateStore(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        SyncError::Internal(msg.into())
    }

    /// Create an invalid-rule error
    pub fn invalid_rule(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        SyncError::InvalidRule {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::invalid_rule("r-0001", "missing destination path");
        assert_eq!(
            err.to_string(),
            "Invalid rule r-0001: missing destination path"
        );
    }

    #[test]
    fn test_conflict_exhaustion_display() {
        let err = SyncError::ConflictProbesExhausted {
            name: "photo.jpg".to_string(),
            probes: 1000,
        };
        assert!(err.to_string().contains("photo.jpg"));
        assert!(err.to_string().contains("1000"));
    }
}
