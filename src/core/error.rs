//! Error types for the filesafe library.
//!
//! Scanning and quarantine failures are reported as typed errors so callers
//! can tell "not found" apart from I/O failures or a corrupt store. The
//! library never panics on these paths; everything is returned as `Result`.

use std::time::Duration;
use thiserror::Error;

/// Error type for scan operations run by the security integrator.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The integrator was used before `initialize` succeeded.
    #[error("security integrator is not initialized")]
    NotInitialized,

    /// The file to scan does not exist or is not a regular file.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// The file exceeds the configured maximum size.
    #[error("file size {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge {
        /// Actual file size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        max: u64,
    },

    /// The adapter could not be initialized or is not reachable.
    #[error("adapter '{adapter}' is unavailable: {reason}")]
    AdapterUnavailable {
        /// Name of the adapter.
        adapter: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The adapter did not finish within its time budget.
    #[error("adapter '{adapter}' timed out after {elapsed:?}")]
    Timeout {
        /// Name of the adapter that timed out.
        adapter: String,
        /// How long the adapter ran before it was abandoned.
        elapsed: Duration,
    },

    /// The adapter ran but failed to produce a verdict.
    #[error("adapter '{adapter}' failed: {message}")]
    AdapterFailed {
        /// Name of the adapter.
        adapter: String,
        /// Error message reported by the adapter.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl ScanError {
    /// Returns the adapter name if this error is associated with one.
    pub fn adapter(&self) -> Option<&str> {
        match self {
            Self::AdapterUnavailable { adapter, .. }
            | Self::Timeout { adapter, .. }
            | Self::AdapterFailed { adapter, .. } => Some(adapter),
            _ => None,
        }
    }

    /// Returns `true` if a retry of the same scan could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::AdapterUnavailable { .. })
    }

    /// Creates an `AdapterUnavailable` error.
    pub fn adapter_unavailable(adapter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AdapterUnavailable {
            adapter: adapter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(adapter: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            adapter: adapter.into(),
            elapsed,
        }
    }

    /// Creates an `AdapterFailed` error.
    pub fn adapter_failed(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AdapterFailed {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Error type for quarantine operations.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// The quarantine manager was used before `initialize` succeeded.
    #[error("quarantine store is not initialized")]
    NotInitialized,

    /// No quarantine store is available to the caller.
    #[error("quarantine store is unavailable")]
    Unavailable,

    /// Quarantine record not found.
    #[error("quarantine record not found: {id}")]
    NotFound {
        /// The quarantine ID that was not found.
        id: String,
    },

    /// The file to quarantine does not exist.
    #[error("source file not found: {path}")]
    SourceNotFound {
        /// Path of the missing source.
        path: String,
    },

    /// The isolated copy referenced by a record is gone.
    #[error("quarantined copy for {id} is missing at {path}")]
    MissingArtifact {
        /// The quarantine ID.
        id: String,
        /// Path where the copy was expected.
        path: String,
    },

    /// The record carries no hash to verify against.
    #[error("no stored hash for quarantine record {id}")]
    NoStoredHash {
        /// The quarantine ID.
        id: String,
    },

    /// The requested status change is not allowed from the current status.
    #[error("cannot {action} quarantine record {id} with status '{status}'")]
    InvalidTransition {
        /// The quarantine ID.
        id: String,
        /// Current status of the record.
        status: String,
        /// Attempted action.
        action: &'static str,
    },

    /// The persisted document is structurally invalid.
    #[error("quarantine store is corrupt: {reason}")]
    CorruptStore {
        /// What failed the structural check.
        reason: String,
    },

    /// Writing the document to disk failed; the mutation was not applied.
    #[error("failed to persist quarantine store: {reason}")]
    PersistFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl QuarantineError {
    /// Creates a `NotFound` error.
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the error means the record or file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::SourceNotFound { .. } | Self::MissingArtifact { .. }
        )
    }
}

/// A specialized `Result` type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// A specialized `Result` type for quarantine operations.
pub type QuarantineResult<T> = Result<T, QuarantineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_adapter() {
        let err = ScanError::adapter_unavailable("clamav", "daemon not running");
        assert_eq!(err.adapter(), Some("clamav"));
        assert!(err.is_recoverable());

        let missing = ScanError::FileNotFound {
            path: "/tmp/missing".into(),
        };
        assert_eq!(missing.adapter(), None);
        assert!(!missing.is_recoverable());
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::FileTooLarge {
            size: 100_000_000,
            max: 50_000_000,
        };
        assert!(err.to_string().contains("100000000"));
        assert!(err.to_string().contains("50000000"));

        let timeout = ScanError::timeout("yara", Duration::from_secs(5));
        assert!(timeout.to_string().contains("yara"));
    }

    #[test]
    fn test_quarantine_error_not_found() {
        assert!(QuarantineError::not_found("abc").is_not_found());
        assert!(QuarantineError::SourceNotFound {
            path: "/x".into()
        }
        .is_not_found());
        assert!(!QuarantineError::Unavailable.is_not_found());
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = QuarantineError::InvalidTransition {
            id: "q-1".into(),
            status: "restored".into(),
            action: "restore",
        };
        assert_eq!(
            err.to_string(),
            "cannot restore quarantine record q-1 with status 'restored'"
        );
    }
}
