//! Core types and traits for the filesafe library.
//!
//! - [`types`] - Timestamps, detail maps, adapter verdicts and slots
//! - [`traits`] - The `SecurityAdapter` trait
//! - [`error`] - Structured error types
//! - [`hasher`] - Streaming SHA-256 file hashing

pub mod error;
pub mod hasher;
pub mod traits;
pub mod types;

pub use error::{QuarantineError, QuarantineResult, ScanError, ScanResult};
pub use hasher::{FileHash, FileHasher};
pub use traits::{ArcAdapter, SecurityAdapter};
pub use types::{AdapterKind, Details, ScanOutcome, Timestamp};
