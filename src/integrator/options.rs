//! Per-scan options and integrator configuration.

use crate::core::AdapterKind;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for a single `scan_file` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Skip the malware engine.
    pub skip_malware: bool,
    /// Skip the pattern analyzer.
    pub skip_patterns: bool,
    /// Skip the metadata sanitizer.
    pub skip_metadata: bool,
    /// Skip the content filter.
    pub skip_content: bool,
    /// Quarantine the file on the first unsafe verdict.
    pub quarantine_failed: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_malware: false,
            skip_patterns: false,
            skip_metadata: false,
            skip_content: false,
            quarantine_failed: true,
        }
    }
}

impl ScanOptions {
    /// Creates options that run everything and quarantine failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips the adapter in `kind`'s slot.
    pub fn skip(mut self, kind: AdapterKind) -> Self {
        *self.flag_mut(kind) = true;
        self
    }

    /// Reports verdicts without quarantining.
    pub fn without_quarantine(mut self) -> Self {
        self.quarantine_failed = false;
        self
    }

    /// Returns `true` if `kind` is skipped.
    pub fn skips(&self, kind: AdapterKind) -> bool {
        match kind {
            AdapterKind::Malware => self.skip_malware,
            AdapterKind::Pattern => self.skip_patterns,
            AdapterKind::Metadata => self.skip_metadata,
            AdapterKind::Content => self.skip_content,
        }
    }

    /// The skipped slots, in scan order.
    pub fn skipped(&self) -> Vec<AdapterKind> {
        AdapterKind::ORDER
            .into_iter()
            .filter(|kind| self.skips(*kind))
            .collect()
    }

    fn flag_mut(&mut self, kind: AdapterKind) -> &mut bool {
        match kind {
            AdapterKind::Malware => &mut self.skip_malware,
            AdapterKind::Pattern => &mut self.skip_patterns,
            AdapterKind::Metadata => &mut self.skip_metadata,
            AdapterKind::Content => &mut self.skip_content,
        }
    }
}

/// What an adapter error means for the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackBehavior {
    /// An adapter error marks the file insecure (it is not quarantined).
    #[default]
    FailClosed,
    /// An adapter error is recorded but does not affect the verdict.
    FailOpen,
}

/// Configuration for the security integrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegratorConfig {
    /// Time budget for each adapter call.
    pub adapter_timeout: Duration,

    /// Largest file accepted for scanning, if limited.
    pub max_file_size: Option<u64>,

    /// How adapter errors affect the verdict.
    pub fallback: FallbackBehavior,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(300),
            max_file_size: None,
            fallback: FallbackBehavior::FailClosed,
        }
    }
}

impl IntegratorConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-adapter timeout.
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    /// Sets the maximum file size.
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = Some(size);
        self
    }

    /// Sets the fallback behavior.
    pub fn with_fallback(mut self, fallback: FallbackBehavior) -> Self {
        self.fallback = fallback;
        self
    }
}
