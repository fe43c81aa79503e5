//! Core traits for the filesafe library.
//!
//! This module defines the `SecurityAdapter` trait that every scanning
//! capability (malware engine, pattern analyzer, metadata sanitizer, content
//! filter) implements.

use crate::core::error::ScanError;
use crate::core::types::ScanOutcome;

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

/// A single scanning capability consumed by the security integrator.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync` for use in async contexts.
/// - `scan` must not modify the file, except for sanitizers which may
///   rewrite it in place and report [`ScanOutcome::sanitized`].
/// - CPU or I/O heavy work should be moved to `tokio::task::spawn_blocking`.
/// - Implementations should never panic; failures are returned as `ScanError`.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use filesafe::core::{SecurityAdapter, ScanOutcome, ScanError};
/// use async_trait::async_trait;
/// use std::path::Path;
///
/// #[derive(Debug)]
/// struct ExtensionBlocklist;
///
/// #[async_trait]
/// impl SecurityAdapter for ExtensionBlocklist {
///     fn name(&self) -> &str {
///         "extension-blocklist"
///     }
///
///     async fn scan(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
///         match path.extension().and_then(|e| e.to_str()) {
///             Some("exe") => Ok(ScanOutcome::flagged(Default::default())),
///             _ => Ok(ScanOutcome::clean()),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait SecurityAdapter: Send + Sync + Debug {
    /// Stable identifier such as "clamav" or "yara".
    fn name(&self) -> &str;

    /// Prepares the adapter (loads rules, connects to a daemon).
    ///
    /// An error marks the adapter unavailable; the rest of the pipeline keeps
    /// working without it.
    async fn initialize(&self) -> Result<(), ScanError> {
        Ok(())
    }

    /// Scans the file at `path`.
    async fn scan(&self, path: &Path) -> Result<ScanOutcome, ScanError>;
}

/// An arc-wrapped adapter for shared ownership.
pub type ArcAdapter = std::sync::Arc<dyn SecurityAdapter>;
