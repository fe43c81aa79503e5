//! Quarantine record types.

use crate::core::error::{QuarantineError, QuarantineResult};
use crate::core::{Details, Timestamp};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unique identifier for a quarantined file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuarantineId(pub String);

impl QuarantineId {
    /// Creates a new random quarantine ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a quarantine ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QuarantineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QuarantineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for QuarantineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for QuarantineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Why a file was quarantined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineReason {
    /// A malware engine flagged the file.
    Malware,
    /// A content filter rejected the file.
    InappropriateContent,
    /// A pattern analyzer matched a rule.
    SuspiciousPattern,
    /// Metadata could not be made safe.
    MetadataRisk,
    /// An operator quarantined the file by hand.
    Manual,
    /// Anything else, including unrecognised values in a loaded document.
    #[serde(other)]
    Unknown,
}

impl QuarantineReason {
    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malware => "malware",
            Self::InappropriateContent => "inappropriate_content",
            Self::SuspiciousPattern => "suspicious_pattern",
            Self::MetadataRisk => "metadata_risk",
            Self::Manual => "manual",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for QuarantineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a record.
///
/// Only `Quarantined -> Restored` and `Quarantined -> Deleted` are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineStatus {
    /// The isolated copy is held in quarantine.
    Quarantined,
    /// The copy was restored to a destination.
    Restored,
    /// The record was flagged deleted; the copy stays on disk.
    Deleted,
}

impl QuarantineStatus {
    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarantined => "quarantined",
            Self::Restored => "restored",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for QuarantineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of event in a record's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// The file entered quarantine.
    Quarantined,
    /// The file was restored.
    Restored,
    /// The record was soft deleted.
    Deleted,
    /// Verification found the isolated copy altered.
    IntegrityFailed,
}

/// One entry of the append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// What happened.
    pub action: HistoryAction,
    /// When it happened.
    pub timestamp: Timestamp,
    /// Action-specific fields, stored inline.
    #[serde(flatten)]
    pub extra: Details,
}

impl HistoryEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(action: HistoryAction) -> Self {
        Self {
            action,
            timestamp: Timestamp::now(),
            extra: Details::new(),
        }
    }

    /// Adds an extra field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Outcome of an integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityResult {
    /// Digest matched.
    Passed,
    /// Digest differed.
    Failed,
}

/// Annotation left on a record by the last failed verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    /// When the check ran.
    pub date: Timestamp,
    /// Result of the check.
    pub result: IntegrityResult,
    /// Digest recorded at quarantine time.
    pub expected_hash: String,
    /// Digest computed during the check.
    pub actual_hash: String,
}

/// Metadata about a quarantined file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    /// Unique identifier for this quarantine record.
    pub id: QuarantineId,

    /// Absolute path of the source at quarantine time.
    pub original_path: PathBuf,

    /// Basename of the source.
    pub original_filename: String,

    /// Absolute path of the isolated copy.
    pub quarantine_path: PathBuf,

    /// When the file was quarantined.
    pub quarantine_time: Timestamp,

    /// Reason for quarantine.
    pub reason: QuarantineReason,

    /// Current lifecycle status.
    pub status: QuarantineStatus,

    /// Caller-supplied details (scan results and the like).
    #[serde(default)]
    pub metadata: Details,

    /// Size of the original in bytes.
    pub file_size: u64,

    /// SHA-256 of the original, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,

    /// Append-only event log.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    /// Where the file was restored to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_path: Option<PathBuf>,

    /// When the file was restored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_time: Option<Timestamp>,

    /// When the record was soft deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_time: Option<Timestamp>,

    /// Result of the last failed verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_check: Option<IntegrityCheck>,
}

impl QuarantineRecord {
    /// Creates a record for a freshly made copy, with its first history entry.
    pub fn new(
        id: QuarantineId,
        original_path: impl Into<PathBuf>,
        quarantine_path: impl Into<PathBuf>,
        reason: QuarantineReason,
        file_size: u64,
        file_hash: impl Into<String>,
    ) -> Self {
        let original_path = original_path.into();
        let original_filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let quarantine_time = Timestamp::now();
        let history = vec![HistoryEntry {
            action: HistoryAction::Quarantined,
            timestamp: quarantine_time.clone(),
            extra: Details::new(),
        }
        .with_extra("reason", reason.as_str())];

        Self {
            id,
            original_path,
            original_filename,
            quarantine_path: quarantine_path.into(),
            quarantine_time,
            reason,
            status: QuarantineStatus::Quarantined,
            metadata: Details::new(),
            file_size,
            file_hash: Some(file_hash.into()),
            history,
            restore_path: None,
            restore_time: None,
            delete_time: None,
            integrity_check: None,
        }
    }

    /// Sets the caller-supplied details.
    pub fn with_metadata(mut self, metadata: Details) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns `true` while the record holds a live quarantined copy.
    pub fn is_quarantined(&self) -> bool {
        self.status == QuarantineStatus::Quarantined
    }

    /// Parsed quarantine time, if well formed.
    pub fn quarantined_at(&self) -> Option<DateTime<Utc>> {
        self.quarantine_time.to_datetime()
    }

    /// Moves the record to `Restored`.
    pub fn mark_restored(&mut self, target: &Path) -> QuarantineResult<()> {
        self.ensure_quarantined("restore")?;
        let now = Timestamp::now();
        self.status = QuarantineStatus::Restored;
        self.restore_path = Some(target.to_path_buf());
        self.restore_time = Some(now.clone());
        self.history.push(HistoryEntry {
            action: HistoryAction::Restored,
            timestamp: now,
            extra: Details::new(),
        }
        .with_extra("restore_path", target.to_string_lossy().into_owned()));
        Ok(())
    }

    /// Moves the record to `Deleted` without touching the copy.
    pub fn mark_deleted(&mut self) -> QuarantineResult<()> {
        self.ensure_quarantined("delete")?;
        let now = Timestamp::now();
        self.status = QuarantineStatus::Deleted;
        self.delete_time = Some(now.clone());
        self.history.push(HistoryEntry {
            action: HistoryAction::Deleted,
            timestamp: now,
            extra: Details::new(),
        });
        Ok(())
    }

    /// Records a failed verification.
    pub fn record_integrity_failure(&mut self, expected: &str, actual: &str) {
        let now = Timestamp::now();
        self.integrity_check = Some(IntegrityCheck {
            date: now.clone(),
            result: IntegrityResult::Failed,
            expected_hash: expected.to_string(),
            actual_hash: actual.to_string(),
        });
        self.history.push(
            HistoryEntry {
                action: HistoryAction::IntegrityFailed,
                timestamp: now,
                extra: Details::new(),
            }
            .with_extra("expected_hash", expected)
            .with_extra("actual_hash", actual),
        );
    }

    fn ensure_quarantined(&self, action: &'static str) -> QuarantineResult<()> {
        if self.is_quarantined() {
            Ok(())
        } else {
            Err(QuarantineError::InvalidTransition {
                id: self.id.to_string(),
                status: self.status.to_string(),
                action,
            })
        }
    }
}

/// Filter for listing quarantine records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuarantineFilter {
    /// Filter by status.
    pub status: Option<QuarantineStatus>,

    /// Filter by reason.
    pub reason: Option<QuarantineReason>,

    /// Filter by SHA-256 digest.
    pub file_hash: Option<String>,

    /// Filter by minimum quarantine date.
    pub quarantined_after: Option<DateTime<Utc>>,

    /// Filter by maximum quarantine date.
    pub quarantined_before: Option<DateTime<Utc>>,

    /// Maximum number of records to return.
    pub limit: Option<usize>,

    /// Offset for pagination.
    pub offset: Option<usize>,
}

impl QuarantineFilter {
    /// Creates a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by status.
    pub fn with_status(mut self, status: QuarantineStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by reason.
    pub fn with_reason(mut self, reason: QuarantineReason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Filters by file hash.
    pub fn with_file_hash(mut self, hash: impl Into<String>) -> Self {
        self.file_hash = Some(hash.into());
        self
    }

    /// Filters by date range.
    pub fn with_date_range(
        mut self,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Self {
        self.quarantined_after = after;
        self.quarantined_before = before;
        self
    }

    /// Sets pagination.
    pub fn with_pagination(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Checks if a record matches this filter (pagination aside).
    ///
    /// Records with a malformed quarantine time never match a date bound.
    pub fn matches(&self, record: &QuarantineRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }

        if let Some(reason) = self.reason {
            if record.reason != reason {
                return false;
            }
        }

        if let Some(ref hash) = self.file_hash {
            if record.file_hash.as_ref() != Some(hash) {
                return false;
            }
        }

        if self.quarantined_after.is_some() || self.quarantined_before.is_some() {
            let Some(at) = record.quarantined_at() else {
                return false;
            };
            if self.quarantined_after.is_some_and(|after| at < after) {
                return false;
            }
            if self.quarantined_before.is_some_and(|before| at > before) {
                return false;
            }
        }

        true
    }

    /// Filters, sorts newest first and paginates.
    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a QuarantineRecord>) -> Vec<QuarantineRecord> {
        let mut matched: Vec<QuarantineRecord> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();

        // Malformed times sort last.
        matched.sort_by(|a, b| b.quarantined_at().cmp(&a.quarantined_at()));

        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        matched.into_iter().skip(offset).take(limit).collect()
    }
}
