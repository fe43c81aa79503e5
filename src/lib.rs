//! # Filesafe
//!
//! A file security pipeline: pluggable scan adapters in front of a
//! file-backed quarantine with restore, integrity checks and retention.
//!
//! ## Overview
//!
//! Filesafe sits between an upload path and the rest of an application:
//!
//! - Scan files with up to four adapters (malware engine, pattern analyzer,
//!   metadata sanitizer, content filter), always in that order
//! - Isolate flagged files in a private quarantine directory, keyed by a
//!   UUID and indexed by a JSON document with a backup copy
//! - Restore, soft delete or permanently delete quarantined files
//! - Detect tampering by re-hashing isolated copies with SHA-256
//! - Expire old records after a retention period
//! - Emit structured audit events through `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filesafe::prelude::*;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let quarantine = QuarantineManager::new(QuarantineConfig::new("data/quarantine"));
//!
//!     let integrator = SecurityIntegrator::builder()
//!         .with_malware_scanner(SignatureAdapter::new("signatures").with_eicar())
//!         .with_quarantine(quarantine)
//!         .build()?;
//!     integrator.initialize().await;
//!
//!     let report = integrator
//!         .scan_file(Path::new("uploads/evil.txt"), ScanOptions::default())
//!         .await?;
//!     if let Some(id) = report.quarantine_id() {
//!         println!("quarantined as {}", id);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: errors, shared types, the adapter trait and SHA-256 hashing
//! - **Adapters**: a configurable mock and a byte-signature matcher
//! - **Quarantine**: the record store, file mover, integrity verifier and
//!   retention sweeper behind the `QuarantineStore` trait
//! - **Integrator**: scan orchestration and quarantine handoff
//! - **Audit**: structured audit events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod audit;
pub mod core;
pub mod integrator;
pub mod quarantine;

// Re-export commonly used types at the crate root
pub use crate::core::{
    AdapterKind, FileHash, FileHasher, QuarantineError, ScanError, ScanOutcome, ScanResult,
    SecurityAdapter,
};

pub use crate::integrator::{ScanOptions, ScanReport, SecurityIntegrator};
pub use crate::quarantine::{
    QuarantineConfig, QuarantineId, QuarantineManager, QuarantineReason, QuarantineRecord,
    QuarantineStatus, QuarantineStore,
};

/// Prelude module for convenient imports.
///
/// ```rust
/// use filesafe::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapters::{MockAdapter, SignatureAdapter};
    pub use crate::core::{
        AdapterKind, Details, FileHash, FileHasher, QuarantineError, ScanError, ScanOutcome,
        ScanResult, SecurityAdapter,
    };
    pub use crate::integrator::{
        FallbackBehavior, IntegratorConfig, ScanAction, ScanOptions, ScanReport,
        SecurityIntegrator,
    };
    pub use crate::quarantine::{
        QuarantineConfig, QuarantineFilter, QuarantineId, QuarantineManager, QuarantineReason,
        QuarantineRecord, QuarantineStatus, QuarantineStore,
    };
}
