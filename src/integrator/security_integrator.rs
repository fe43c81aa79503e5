//! The security integrator.

use crate::audit::{emit_adapter_result, emit_scan_report, emit_scan_started};
use crate::core::error::{QuarantineError, ScanError, ScanResult};
use crate::core::{AdapterKind, ArcAdapter, Details, ScanOutcome, SecurityAdapter};
use crate::integrator::options::{FallbackBehavior, IntegratorConfig, ScanOptions};
use crate::integrator::report::{ComponentReport, ScanAction, ScanReport};
use crate::quarantine::{
    QuarantineFilter, QuarantineId, QuarantineReason, QuarantineRecord, QuarantineStatus,
    QuarantineStore,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Quarantine reason used when the adapter in `kind`'s slot flags a file.
pub fn reason_for(kind: AdapterKind) -> QuarantineReason {
    match kind {
        AdapterKind::Malware => QuarantineReason::Malware,
        AdapterKind::Pattern => QuarantineReason::SuspiciousPattern,
        AdapterKind::Metadata => QuarantineReason::MetadataRisk,
        AdapterKind::Content => QuarantineReason::InappropriateContent,
    }
}

/// Which components came up during `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Availability of each configured adapter slot.
    pub adapters: BTreeMap<AdapterKind, bool>,
    /// Whether a quarantine store is configured and initialized.
    pub quarantine: bool,
    /// Whether at least one component is available.
    pub initialized: bool,
}

/// Builder for creating a `SecurityIntegrator`.
#[derive(Default)]
pub struct SecurityIntegratorBuilder {
    slots: [Option<ArcAdapter>; 4],
    quarantine: Option<Arc<dyn QuarantineStore>>,
    config: IntegratorConfig,
}

impl SecurityIntegratorBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts an adapter in the slot for `kind`, replacing any previous one.
    pub fn with_adapter(mut self, kind: AdapterKind, adapter: ArcAdapter) -> Self {
        self.slots[kind.index()] = Some(adapter);
        self
    }

    /// Sets the malware engine.
    pub fn with_malware_scanner<A: SecurityAdapter + 'static>(self, adapter: A) -> Self {
        self.with_adapter(AdapterKind::Malware, Arc::new(adapter))
    }

    /// Sets the pattern analyzer.
    pub fn with_pattern_analyzer<A: SecurityAdapter + 'static>(self, adapter: A) -> Self {
        self.with_adapter(AdapterKind::Pattern, Arc::new(adapter))
    }

    /// Sets the metadata sanitizer.
    pub fn with_metadata_sanitizer<A: SecurityAdapter + 'static>(self, adapter: A) -> Self {
        self.with_adapter(AdapterKind::Metadata, Arc::new(adapter))
    }

    /// Sets the content filter.
    pub fn with_content_filter<A: SecurityAdapter + 'static>(self, adapter: A) -> Self {
        self.with_adapter(AdapterKind::Content, Arc::new(adapter))
    }

    /// Sets the quarantine store.
    pub fn with_quarantine<Q: QuarantineStore + 'static>(mut self, store: Q) -> Self {
        self.quarantine = Some(Arc::new(store));
        self
    }

    /// Sets a shared quarantine store.
    pub fn with_shared_quarantine(mut self, store: Arc<dyn QuarantineStore>) -> Self {
        self.quarantine = Some(store);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: IntegratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the integrator. Does no I/O.
    pub fn build(self) -> Result<SecurityIntegrator, ScanError> {
        if self.config.adapter_timeout.is_zero() {
            return Err(ScanError::configuration("adapter timeout must be non-zero"));
        }

        Ok(SecurityIntegrator {
            slots: self.slots,
            quarantine: self.quarantine,
            config: self.config,
            available: Default::default(),
            quarantine_available: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
        })
    }
}

impl std::fmt::Debug for SecurityIntegratorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityIntegratorBuilder")
            .field("adapter_count", &self.slots.iter().flatten().count())
            .field("has_quarantine", &self.quarantine.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Runs the adapters over a file and quarantines it on the first unsafe
/// verdict.
///
/// Adapters always run in the order malware, pattern, metadata, content.
/// A scan creates at most one quarantine record.
///
/// # Example
///
/// ```rust,ignore
/// use filesafe::prelude::*;
///
/// let integrator = SecurityIntegrator::builder()
///     .with_malware_scanner(SignatureAdapter::new("signatures").with_eicar())
///     .with_quarantine(QuarantineManager::new(QuarantineConfig::new("/var/lib/app/quarantine")))
///     .build()?;
/// integrator.initialize().await;
///
/// let report = integrator.scan_file(Path::new("/uploads/evil.txt"), ScanOptions::default()).await?;
/// if !report.secure {
///     println!("quarantined as {:?}", report.quarantine_id());
/// }
/// ```
pub struct SecurityIntegrator {
    slots: [Option<ArcAdapter>; 4],
    quarantine: Option<Arc<dyn QuarantineStore>>,
    config: IntegratorConfig,
    available: [AtomicBool; 4],
    quarantine_available: AtomicBool,
    initialized: AtomicBool,
}

impl SecurityIntegrator {
    /// Creates a new builder.
    pub fn builder() -> SecurityIntegratorBuilder {
        SecurityIntegratorBuilder::new()
    }

    /// Initializes every configured component independently.
    ///
    /// Returns `true` if at least one component became available.
    pub async fn initialize(&self) -> bool {
        for kind in AdapterKind::ORDER {
            let Some(adapter) = &self.slots[kind.index()] else {
                continue;
            };
            let ok = match adapter.initialize().await {
                Ok(()) => {
                    tracing::info!(component = %kind, adapter = adapter.name(), "Adapter initialized");
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        component = %kind,
                        adapter = adapter.name(),
                        error = %e,
                        "Adapter unavailable"
                    );
                    false
                }
            };
            self.available[kind.index()].store(ok, Ordering::SeqCst);
        }

        if let Some(store) = &self.quarantine {
            let ok = match store.initialize().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Quarantine store unavailable");
                    false
                }
            };
            self.quarantine_available.store(ok, Ordering::SeqCst);
        }

        let any = self.available.iter().any(|a| a.load(Ordering::SeqCst))
            || self.quarantine_available.load(Ordering::SeqCst);
        self.initialized.store(any, Ordering::SeqCst);

        tracing::info!(initialized = any, "Security integrator initialized");
        any
    }

    /// Per-component availability.
    pub fn component_status(&self) -> ComponentStatus {
        let adapters = AdapterKind::ORDER
            .into_iter()
            .filter(|kind| self.slots[kind.index()].is_some())
            .map(|kind| (kind, self.available[kind.index()].load(Ordering::SeqCst)))
            .collect();

        ComponentStatus {
            adapters,
            quarantine: self.quarantine_available.load(Ordering::SeqCst),
            initialized: self.initialized.load(Ordering::SeqCst),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Scans one file.
    ///
    /// Fails only when the integrator is not initialized or the file cannot
    /// be scanned at all. Adapter failures and quarantine failures are
    /// recorded in the report.
    pub async fn scan_file(&self, path: &Path, options: ScanOptions) -> ScanResult<ScanReport> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(ScanError::NotInitialized);
        }

        let metadata = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                return Err(ScanError::FileNotFound {
                    path: path.display().to_string(),
                })
            }
        };
        if let Some(max) = self.config.max_file_size {
            if metadata.len() > max {
                return Err(ScanError::FileTooLarge {
                    size: metadata.len(),
                    max,
                });
            }
        }

        emit_scan_started(path, &options.skipped());
        let started = Instant::now();
        let mut report = ScanReport::new(path);

        for kind in AdapterKind::ORDER {
            if options.skips(kind) {
                continue;
            }
            let Some(adapter) = self.available_adapter(kind) else {
                continue;
            };

            let adapter_started = Instant::now();
            let result = self.scan_with_timeout(adapter, path).await;
            let elapsed = adapter_started.elapsed();
            emit_adapter_result(path, kind, adapter.name(), &result, elapsed);

            match result {
                Ok(outcome) => {
                    self.apply_outcome(&mut report, path, kind, &outcome, &options)
                        .await;
                    report
                        .components
                        .insert(kind, ComponentReport::completed(adapter.name(), outcome, elapsed));
                }
                Err(e) => {
                    tracing::warn!(
                        component = %kind,
                        adapter = adapter.name(),
                        error = %e,
                        "Adapter failed, continuing with others"
                    );
                    report.errors.push(format!("{}: {}", kind, e));
                    report
                        .components
                        .insert(kind, ComponentReport::failed(adapter.name(), &e, elapsed));
                    if self.config.fallback == FallbackBehavior::FailClosed {
                        report.secure = false;
                    }
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            file_path = %path.display(),
            secure = report.secure,
            components = report.components.len(),
            quarantine_id = ?report.quarantine_id(),
            duration_ms = report.duration_ms,
            "Scan completed"
        );
        emit_scan_report(&report);

        Ok(report)
    }

    async fn apply_outcome(
        &self,
        report: &mut ScanReport,
        path: &Path,
        kind: AdapterKind,
        outcome: &ScanOutcome,
        options: &ScanOptions,
    ) {
        if outcome.sanitized {
            report.actions.push(ScanAction::Sanitized {
                component: kind,
                details: outcome.details.clone(),
            });
            return;
        }
        if outcome.clean {
            return;
        }

        report.secure = false;
        if !options.quarantine_failed || report.is_quarantined() {
            return;
        }

        let reason = reason_for(kind);
        let mut details = Details::new();
        details.insert("component".into(), kind.component_name().into());
        details.insert(
            format!("{}_results", kind.component_name()),
            serde_json::to_value(outcome).unwrap_or_default(),
        );

        match self.quarantine_handoff(path, reason, details).await {
            Ok(quarantine_id) => {
                tracing::info!(
                    file_path = %path.display(),
                    component = %kind,
                    quarantine_id = %quarantine_id,
                    "File quarantined"
                );
                report.actions.push(ScanAction::Quarantined {
                    component: kind,
                    reason,
                    quarantine_id,
                });
            }
            Err(e) => {
                tracing::error!(file_path = %path.display(), component = %kind, error = %e, "Quarantine failed");
                report.errors.push(format!("quarantine: {}", e));
            }
        }
    }

    /// Hands a file to the quarantine store.
    pub async fn quarantine_handoff(
        &self,
        path: &Path,
        reason: QuarantineReason,
        details: Details,
    ) -> Result<QuarantineId, QuarantineError> {
        let store = self.quarantine_store().ok_or(QuarantineError::Unavailable)?;
        store.quarantine_file(path, reason, details).await
    }

    /// Records in the store, optionally filtered by status. Empty when the
    /// store is unavailable.
    pub async fn get_quarantined_files(&self, status: Option<QuarantineStatus>) -> Vec<QuarantineRecord> {
        let Some(store) = self.quarantine_store() else {
            return Vec::new();
        };
        let filter = QuarantineFilter {
            status,
            ..QuarantineFilter::default()
        };
        store.list(filter).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to list quarantined files");
            Vec::new()
        })
    }

    /// One record, if the store is available and has it.
    pub async fn get_quarantined_file_info(&self, id: &QuarantineId) -> Option<QuarantineRecord> {
        let store = self.quarantine_store()?;
        match store.get_record(id).await {
            Ok(record) => Some(record),
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!(quarantine_id = %id, error = %e, "Failed to read quarantine record");
                }
                None
            }
        }
    }

    /// Restores a quarantined file to `target` or its original path.
    pub async fn restore_quarantined_file(
        &self,
        id: &QuarantineId,
        target: Option<&Path>,
    ) -> Result<PathBuf, QuarantineError> {
        let store = self.quarantine_store().ok_or(QuarantineError::Unavailable)?;
        store.restore_file(id, target).await
    }

    /// Deletes a quarantined file, soft or permanent.
    pub async fn delete_quarantined_file(
        &self,
        id: &QuarantineId,
        permanent: bool,
    ) -> Result<(), QuarantineError> {
        let store = self.quarantine_store().ok_or(QuarantineError::Unavailable)?;
        store.delete_quarantined_file(id, permanent).await
    }

    /// Removes records older than `days`. Zero when the store is unavailable
    /// or the sweep fails.
    pub async fn clean_quarantine(&self, days: u32) -> usize {
        let Some(store) = self.quarantine_store() else {
            return 0;
        };
        store.clean_quarantine(days).await.unwrap_or_else(|e| {
            tracing::warn!(days, error = %e, "Quarantine cleanup failed");
            0
        })
    }

    /// Checks a quarantined file against its recorded digest.
    pub async fn verify_quarantined_file(&self, id: &QuarantineId) -> Result<bool, QuarantineError> {
        let store = self.quarantine_store().ok_or(QuarantineError::Unavailable)?;
        store.verify_integrity(id).await
    }

    fn available_adapter(&self, kind: AdapterKind) -> Option<&ArcAdapter> {
        self.slots[kind.index()]
            .as_ref()
            .filter(|_| self.available[kind.index()].load(Ordering::SeqCst))
    }

    fn quarantine_store(&self) -> Option<&Arc<dyn QuarantineStore>> {
        self.quarantine
            .as_ref()
            .filter(|_| self.quarantine_available.load(Ordering::SeqCst))
    }

    async fn scan_with_timeout(&self, adapter: &ArcAdapter, path: &Path) -> ScanResult<ScanOutcome> {
        match tokio::time::timeout(self.config.adapter_timeout, adapter.scan(path)).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::timeout(adapter.name(), self.config.adapter_timeout)),
        }
    }
}

impl std::fmt::Debug for SecurityIntegrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityIntegrator")
            .field("status", &self.component_status())
            .field("config", &self.config)
            .finish()
    }
}
