//! Audit event types and emission functions.

use crate::core::{AdapterKind, ScanError, ScanOutcome};
use crate::integrator::{ScanAction, ScanReport};
use crate::quarantine::QuarantineRecord;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// A lifecycle operation on a quarantine record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineOperation {
    /// A file entered quarantine.
    Quarantined,
    /// A file was restored.
    Restored,
    /// A record was soft deleted.
    Deleted,
    /// A record and its copy were removed.
    Purged,
    /// A record was removed by the retention sweep.
    Expired,
    /// Verification found the copy altered.
    IntegrityFailed,
}

impl QuarantineOperation {
    /// Returns the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarantined => "quarantined",
            Self::Restored => "restored",
            Self::Deleted => "deleted",
            Self::Purged => "purged",
            Self::Expired => "expired",
            Self::IntegrityFailed => "integrity_failed",
        }
    }
}

impl fmt::Display for QuarantineOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit event for a completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Scanned file.
    pub file_path: String,

    /// Overall verdict.
    pub secure: bool,

    /// Components that ran.
    pub components: Vec<String>,

    /// Quarantine ID, if the scan quarantined the file.
    pub quarantine_id: Option<String>,

    /// Number of sanitize actions.
    pub sanitized: usize,

    /// Number of recorded errors.
    pub error_count: usize,

    /// Scan duration in milliseconds.
    pub duration_ms: u64,
}

impl From<&ScanReport> for ScanAuditEvent {
    fn from(report: &ScanReport) -> Self {
        Self {
            timestamp: Utc::now(),
            file_path: report.file_path.display().to_string(),
            secure: report.secure,
            components: report
                .components
                .keys()
                .map(|kind| kind.component_name().to_string())
                .collect(),
            quarantine_id: report.quarantine_id().map(|id| id.to_string()),
            sanitized: report
                .actions
                .iter()
                .filter(|a| matches!(a, ScanAction::Sanitized { .. }))
                .count(),
            error_count: report.errors.len(),
            duration_ms: report.duration_ms,
        }
    }
}

impl AuditEvent for ScanAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_report"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for a quarantine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Quarantine ID.
    pub quarantine_id: String,

    /// SHA-256 of the original, if known.
    pub file_hash: Option<String>,

    /// Operation performed.
    pub operation: QuarantineOperation,

    /// Reason for quarantine.
    pub reason: String,

    /// Status after the operation.
    pub status: String,

    /// Original file name.
    pub original_filename: String,

    /// File size in bytes.
    pub file_size: u64,
}

impl QuarantineAuditEvent {
    /// Builds an event for `record`.
    pub fn new(record: &QuarantineRecord, operation: QuarantineOperation) -> Self {
        Self {
            timestamp: Utc::now(),
            quarantine_id: record.id.to_string(),
            file_hash: record.file_hash.clone(),
            operation,
            reason: record.reason.to_string(),
            status: record.status.to_string(),
            original_filename: record.original_filename.clone(),
            file_size: record.file_size,
        }
    }
}

impl AuditEvent for QuarantineAuditEvent {
    fn event_type(&self) -> &'static str {
        "quarantine_operation"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a scan starting.
pub fn emit_scan_started(path: &Path, skipped: &[AdapterKind]) {
    tracing::info!(
        target: "filesafe::audit",
        event_type = "scan_started",
        file_path = %path.display(),
        skipped = ?skipped,
        "Scan started"
    );
}

/// Emits an audit event for one adapter finishing (or failing).
pub fn emit_adapter_result(
    path: &Path,
    kind: AdapterKind,
    adapter: &str,
    result: &Result<ScanOutcome, ScanError>,
    elapsed: Duration,
) {
    match result {
        Ok(outcome) => tracing::info!(
            target: "filesafe::audit",
            event_type = "adapter_result",
            file_path = %path.display(),
            component = %kind,
            adapter = %adapter,
            clean = outcome.clean,
            sanitized = outcome.sanitized,
            duration_ms = elapsed.as_millis() as u64,
            "Adapter finished"
        ),
        Err(e) => tracing::warn!(
            target: "filesafe::audit",
            event_type = "adapter_result",
            file_path = %path.display(),
            component = %kind,
            adapter = %adapter,
            error = %e,
            duration_ms = elapsed.as_millis() as u64,
            "Adapter failed"
        ),
    }
}

/// Emits an audit event for a scan report.
pub fn emit_scan_report(report: &ScanReport) {
    let event = ScanAuditEvent::from(report);

    tracing::info!(
        target: "filesafe::audit",
        event_type = event.event_type(),
        file_path = %event.file_path,
        secure = event.secure,
        components = ?event.components,
        quarantine_id = ?event.quarantine_id,
        sanitized = event.sanitized,
        error_count = event.error_count,
        duration_ms = event.duration_ms,
        "Scan report generated"
    );
}

/// Emits an audit event for a quarantine operation.
pub fn emit_quarantine_event(record: &QuarantineRecord, operation: QuarantineOperation) {
    let event = QuarantineAuditEvent::new(record, operation);

    tracing::info!(
        target: "filesafe::audit",
        event_type = event.event_type(),
        quarantine_id = %event.quarantine_id,
        file_hash = ?event.file_hash,
        operation = %event.operation,
        reason = %event.reason,
        status = %event.status,
        original_filename = %event.original_filename,
        file_size = event.file_size,
        "Quarantine operation performed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quarantine::{QuarantineId, QuarantineReason};

    #[test]
    fn test_quarantine_event_from_record() {
        let mut record = QuarantineRecord::new(
            QuarantineId::from("q-1"),
            "/uploads/evil.txt",
            "/q/files/q-1/evil.txt",
            QuarantineReason::SuspiciousPattern,
            42,
            "deadbeef",
        );
        record.mark_deleted().unwrap();

        let event = QuarantineAuditEvent::new(&record, QuarantineOperation::Deleted);
        assert_eq!(event.quarantine_id, "q-1");
        assert_eq!(event.reason, "suspicious_pattern");
        assert_eq!(event.status, "deleted");
        assert_eq!(event.file_hash.as_deref(), Some("deadbeef"));
        assert_eq!(event.event_type(), "quarantine_operation");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["operation"], "deleted");
    }

    #[test]
    fn test_scan_event_from_report() {
        let mut report = ScanReport::new("/uploads/evil.txt");
        report.secure = false;
        report.actions.push(ScanAction::Quarantined {
            component: AdapterKind::Pattern,
            reason: QuarantineReason::SuspiciousPattern,
            quarantine_id: QuarantineId::from("q-9"),
        });
        report.errors.push("content filter timed out".to_string());

        let event = ScanAuditEvent::from(&report);
        assert!(!event.secure);
        assert_eq!(event.quarantine_id.as_deref(), Some("q-9"));
        assert_eq!(event.sanitized, 0);
        assert_eq!(event.error_count, 1);
    }
}
