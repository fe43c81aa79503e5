//! Scan reports.

use crate::core::{AdapterKind, Details, ScanError, ScanOutcome, Timestamp};
use crate::quarantine::{QuarantineId, QuarantineReason};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// What one adapter reported during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentReport {
    /// Name of the adapter in the slot.
    pub adapter: String,

    /// Verdict, if the adapter produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ScanOutcome>,

    /// Error message, if the adapter failed or timed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// How long the adapter ran.
    pub duration_ms: u64,
}

impl ComponentReport {
    /// A report for an adapter that returned a verdict.
    pub fn completed(adapter: impl Into<String>, outcome: ScanOutcome, elapsed: Duration) -> Self {
        Self {
            adapter: adapter.into(),
            outcome: Some(outcome),
            error: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// A report for an adapter that failed.
    pub fn failed(adapter: impl Into<String>, error: &ScanError, elapsed: Duration) -> Self {
        Self {
            adapter: adapter.into(),
            outcome: None,
            error: Some(error.to_string()),
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Returns `true` if the adapter judged the file unsafe.
    pub fn is_unsafe(&self) -> bool {
        self.outcome.as_ref().is_some_and(ScanOutcome::is_unsafe)
    }
}

/// Something the integrator did to the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScanAction {
    /// The file was copied into quarantine.
    Quarantined {
        /// Component whose verdict triggered the quarantine.
        component: AdapterKind,
        /// Reason recorded on the quarantine record.
        reason: QuarantineReason,
        /// Id of the new record.
        quarantine_id: QuarantineId,
    },
    /// A sanitizer repaired the file in place.
    Sanitized {
        /// Component that repaired the file.
        component: AdapterKind,
        /// What was removed.
        details: Details,
    },
}

/// Outcome of `SecurityIntegrator::scan_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// The scanned file.
    pub file_path: PathBuf,

    /// When the scan started.
    pub scan_time: Timestamp,

    /// `false` once any adapter judged the file unsafe.
    pub secure: bool,

    /// Per-component results, in scan order.
    pub components: BTreeMap<AdapterKind, ComponentReport>,

    /// Actions taken, in the order they happened.
    pub actions: Vec<ScanAction>,

    /// Adapter and quarantine errors.
    pub errors: Vec<String>,

    /// Total scan time.
    pub duration_ms: u64,
}

impl ScanReport {
    /// Creates an empty, secure report for `file_path`.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            scan_time: Timestamp::now(),
            secure: true,
            components: BTreeMap::new(),
            actions: Vec::new(),
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// The report for one component, if it ran.
    pub fn component(&self, kind: AdapterKind) -> Option<&ComponentReport> {
        self.components.get(&kind)
    }

    /// Id of the quarantine record created by this scan.
    pub fn quarantine_id(&self) -> Option<&QuarantineId> {
        self.actions.iter().find_map(|action| match action {
            ScanAction::Quarantined { quarantine_id, .. } => Some(quarantine_id),
            ScanAction::Sanitized { .. } => None,
        })
    }

    /// Returns `true` if the file was quarantined.
    pub fn is_quarantined(&self) -> bool {
        self.quarantine_id().is_some()
    }

    /// Returns `true` if any error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialized_shape() {
        let mut report = ScanReport::new("/uploads/photo.jpg");
        report.components.insert(
            AdapterKind::Metadata,
            ComponentReport::completed("exif", ScanOutcome::sanitized(Details::new()), Duration::from_millis(3)),
        );
        report.components.insert(
            AdapterKind::Malware,
            ComponentReport::completed("clamav", ScanOutcome::clean(), Duration::from_millis(7)),
        );
        report.actions.push(ScanAction::Sanitized {
            component: AdapterKind::Metadata,
            details: Details::new(),
        });

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["secure"], true);
        assert_eq!(value["components"]["malware_scan"]["adapter"], "clamav");
        assert_eq!(value["actions"][0]["action"], "sanitized");
        assert_eq!(value["actions"][0]["component"], "metadata_sanitization");

        let keys: Vec<_> = report.components.keys().copied().collect();
        assert_eq!(keys, vec![AdapterKind::Malware, AdapterKind::Metadata]);
        assert!(!report.is_quarantined());
    }

    #[test]
    fn test_quarantine_id_lookup() {
        let mut report = ScanReport::new("/uploads/evil.txt");
        report.actions.push(ScanAction::Quarantined {
            component: AdapterKind::Malware,
            reason: QuarantineReason::Malware,
            quarantine_id: QuarantineId::from("q-1"),
        });

        assert_eq!(report.quarantine_id().map(QuarantineId::as_str), Some("q-1"));
        let value = serde_json::to_value(&report.actions[0]).unwrap();
        assert_eq!(value["action"], "quarantined");
        assert_eq!(value["reason"], "malware");
        assert_eq!(value["quarantine_id"], "q-1");
    }

    #[test]
    fn test_failed_component() {
        let err = ScanError::adapter_failed("yara", "rules missing");
        let component = ComponentReport::failed("yara", &err, Duration::ZERO);
        assert!(!component.is_unsafe());
        assert_eq!(component.error.as_deref(), Some("adapter 'yara' failed: rules missing"));
    }
}
