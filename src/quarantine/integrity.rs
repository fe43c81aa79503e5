//! Verifying isolated copies against their recorded digest.

use crate::core::error::{QuarantineError, QuarantineResult};
use crate::core::FileHasher;
use crate::quarantine::record::QuarantineRecord;

/// Result of comparing a copy with its recorded digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityVerdict {
    /// The copy hashes to the recorded digest.
    Intact,
    /// The copy was altered.
    Tampered {
        /// Digest recorded at quarantine time.
        expected: String,
        /// Digest of the copy now.
        actual: String,
    },
}

impl IntegrityVerdict {
    /// Returns `true` for [`IntegrityVerdict::Intact`].
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact)
    }
}

/// Recomputes the SHA-256 of isolated copies.
#[derive(Debug, Clone, Default)]
pub struct IntegrityVerifier {
    hasher: FileHasher,
}

impl IntegrityVerifier {
    /// Creates a verifier using `hasher`.
    pub fn new(hasher: FileHasher) -> Self {
        Self { hasher }
    }

    /// Checks the copy of `record`. Does not modify the record.
    pub fn verify(&self, record: &QuarantineRecord) -> QuarantineResult<IntegrityVerdict> {
        let expected = record
            .file_hash
            .as_deref()
            .ok_or_else(|| QuarantineError::NoStoredHash {
                id: record.id.to_string(),
            })?;

        if !record.quarantine_path.is_file() {
            return Err(QuarantineError::MissingArtifact {
                id: record.id.to_string(),
                path: record.quarantine_path.display().to_string(),
            });
        }

        let actual = self.hasher.hash_file(&record.quarantine_path)?.sha256;
        if actual.eq_ignore_ascii_case(expected) {
            Ok(IntegrityVerdict::Intact)
        } else {
            Ok(IntegrityVerdict::Tampered {
                expected: expected.to_string(),
                actual,
            })
        }
    }
}
