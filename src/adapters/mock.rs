//! Mock adapter for testing.
//!
//! This module provides a configurable adapter that can be used in tests to
//! simulate verdicts, failures and slow engines without a real scanner.

use crate::core::{FileHasher, ScanError, ScanOutcome, SecurityAdapter};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// A mock adapter for testing purposes.
///
/// The mock can return specific outcomes for specific SHA-256 digests, or a
/// default outcome for unknown files.
///
/// # Examples
///
/// ```rust
/// use filesafe::adapters::MockAdapter;
/// use filesafe::core::{Details, ScanOutcome};
/// use std::time::Duration;
///
/// // Reports every file as clean
/// let adapter = MockAdapter::new_clean();
///
/// // Flags every file
/// let adapter = MockAdapter::new_flagged(Details::new());
///
/// // Custom response per digest, with latency
/// let adapter = MockAdapter::new()
///     .with_response("abc123", ScanOutcome::clean())
///     .with_latency(Duration::from_millis(100));
/// ```
#[derive(Debug)]
pub struct MockAdapter {
    /// Name of this adapter instance.
    name: String,
    /// Responses keyed by SHA-256 digest.
    responses: RwLock<HashMap<String, ScanOutcome>>,
    /// Default outcome for files not in the response map.
    default_outcome: ScanOutcome,
    /// Simulated latency for scans.
    latency: Option<Duration>,
    /// Whether every scan fails.
    fail_scans: AtomicBool,
    /// Whether `initialize` fails.
    fail_initialize: AtomicBool,
    /// Counter for scan operations.
    scan_count: AtomicU64,
}

impl MockAdapter {
    /// Creates a new mock adapter that reports files as clean.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            responses: RwLock::new(HashMap::new()),
            default_outcome: ScanOutcome::clean(),
            latency: None,
            fail_scans: AtomicBool::new(false),
            fail_initialize: AtomicBool::new(false),
            scan_count: AtomicU64::new(0),
        }
    }

    /// Creates a mock adapter that always reports clean.
    pub fn new_clean() -> Self {
        Self::new()
    }

    /// Creates a mock adapter that flags every file.
    pub fn new_flagged(details: crate::core::Details) -> Self {
        Self {
            default_outcome: ScanOutcome::flagged(details),
            ..Self::new()
        }
    }

    /// Creates a mock adapter that reports every file as sanitized.
    pub fn new_sanitizing(details: crate::core::Details) -> Self {
        Self {
            default_outcome: ScanOutcome::sanitized(details),
            ..Self::new()
        }
    }

    /// Sets the name of this adapter.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the default outcome for files not in the response map.
    pub fn with_default_outcome(mut self, outcome: ScanOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Adds a response for a specific SHA-256 digest.
    pub fn with_response(self, hash: impl Into<String>, outcome: ScanOutcome) -> Self {
        self.add_response(hash, outcome);
        self
    }

    /// Sets the simulated latency for scans.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every scan fail.
    pub fn with_scan_failure(self) -> Self {
        self.set_fail_scans(true);
        self
    }

    /// Makes `initialize` fail.
    pub fn with_initialize_failure(self) -> Self {
        self.fail_initialize.store(true, Ordering::Relaxed);
        self
    }

    /// Toggles scan failures at runtime.
    pub fn set_fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::Relaxed);
    }

    /// Returns the number of scans performed.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Adds a response for a specific digest (mutable version).
    pub fn add_response(&self, hash: impl Into<String>, outcome: ScanOutcome) {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(hash.into(), outcome);
    }

    /// Clears all configured responses.
    pub fn clear_responses(&self) {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn lookup(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        let responses = self
            .responses
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if responses.is_empty() {
            return Ok(self.default_outcome.clone());
        }

        let hash = FileHasher::new().hash_file(path)?;
        Ok(responses
            .get(&hash.sha256)
            .cloned()
            .unwrap_or_else(|| self.default_outcome.clone()))
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecurityAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ScanError> {
        if self.fail_initialize.load(Ordering::Relaxed) {
            return Err(ScanError::adapter_unavailable(
                &self.name,
                "simulated initialization failure",
            ));
        }
        Ok(())
    }

    async fn scan(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_scans.load(Ordering::Relaxed) {
            return Err(ScanError::adapter_failed(&self.name, "simulated failure"));
        }

        self.lookup(path)
    }
}
