//! Structured audit logging.
//!
//! This module provides functions for emitting structured audit events
//! using the `tracing` crate under the `filesafe::audit` target. Events can
//! be captured by any tracing subscriber (JSON file, OpenTelemetry, etc.).

mod events;

pub use events::{
    emit_adapter_result, emit_quarantine_event, emit_scan_report, emit_scan_started, AuditEvent,
    QuarantineAuditEvent, QuarantineOperation, ScanAuditEvent,
};
