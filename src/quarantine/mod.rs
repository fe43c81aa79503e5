//! Quarantine storage for unsafe files.
//!
//! Files are copied (never moved) into an isolated directory, tracked in a
//! single JSON document and can later be restored, deleted, verified against
//! their recorded SHA-256 or expired by age.
//!
//! - [`QuarantineManager`] - the file-backed [`QuarantineStore`]
//! - [`DocumentStore`] - loads and saves the document
//! - [`FileMover`] - copies files in and out
//! - [`IntegrityVerifier`] - detects tampering with isolated copies
//! - [`RetentionSweeper`] - selects expired records

mod config;
mod document;
mod integrity;
mod manager;
mod mover;
mod permissions;
mod record;
mod retention;
mod store;
mod traits;

pub use config::QuarantineConfig;
pub use document::{StoreDocument, StoreMetadata, DOCUMENT_VERSION};
pub use integrity::{IntegrityVerdict, IntegrityVerifier};
pub use manager::{QuarantineManager, QuarantineStats};
pub use mover::{FileMover, IsolatedCopy, StagedRestore};
pub use record::{
    HistoryAction, HistoryEntry, IntegrityCheck, IntegrityResult, QuarantineFilter, QuarantineId,
    QuarantineReason, QuarantineRecord, QuarantineStatus,
};
pub use retention::RetentionSweeper;
pub use store::DocumentStore;
pub use traits::QuarantineStore;
