//! Scan orchestration.
//!
//! The [`SecurityIntegrator`] runs up to four adapters over a file in a fixed
//! order (malware, pattern, metadata, content), collects their verdicts into
//! a [`ScanReport`], and hands the file to a quarantine store on the first
//! unsafe verdict.

mod options;
mod report;
mod security_integrator;

pub use options::{FallbackBehavior, IntegratorConfig, ScanOptions};
pub use report::{ComponentReport, ScanAction, ScanReport};
pub use security_integrator::{reason_for, ComponentStatus, SecurityIntegrator, SecurityIntegratorBuilder};
