//! The quarantine manager.
//!
//! `QuarantineManager` owns the document and composes the store, mover,
//! verifier and sweeper. Every operation runs on the blocking pool and holds
//! one mutex for its whole read-modify-write, so concurrent callers never
//! interleave. A mutation is applied in memory, saved, and rolled back if the
//! save fails.

use crate::audit::{emit_quarantine_event, QuarantineOperation};
use crate::core::error::{QuarantineError, QuarantineResult};
use crate::core::{Details, FileHasher};
use crate::quarantine::config::QuarantineConfig;
use crate::quarantine::document::StoreDocument;
use crate::quarantine::integrity::{IntegrityVerdict, IntegrityVerifier};
use crate::quarantine::mover::FileMover;
use crate::quarantine::permissions::create_private_dir;
use crate::quarantine::record::{
    QuarantineFilter, QuarantineId, QuarantineReason, QuarantineRecord, QuarantineStatus,
};
use crate::quarantine::retention::RetentionSweeper;
use crate::quarantine::store::DocumentStore;
use crate::quarantine::traits::QuarantineStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Aggregate numbers about the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineStats {
    /// All records.
    pub total: usize,
    /// Records still quarantined.
    pub quarantined: usize,
    /// Records restored.
    pub restored: usize,
    /// Records soft deleted.
    pub deleted: usize,
    /// Sum of `file_size` over all records.
    pub total_bytes: u64,
}

/// File-backed quarantine store.
///
/// Cheap to clone; clones share the same document.
///
/// # Example
///
/// ```rust,ignore
/// use filesafe::quarantine::{QuarantineConfig, QuarantineManager, QuarantineReason, QuarantineStore};
///
/// let manager = QuarantineManager::new(QuarantineConfig::new("/var/lib/app/quarantine"));
/// manager.initialize().await?;
/// let id = manager
///     .quarantine_file(Path::new("/uploads/evil.txt"), QuarantineReason::Malware, Default::default())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct QuarantineManager {
    inner: Arc<ManagerInner>,
}

#[derive(Debug)]
struct ManagerInner {
    config: QuarantineConfig,
    store: DocumentStore,
    mover: FileMover,
    verifier: IntegrityVerifier,
    document: Mutex<Option<StoreDocument>>,
}

impl QuarantineManager {
    /// Creates a manager. Does no I/O; call `initialize` before use.
    pub fn new(config: QuarantineConfig) -> Self {
        let hasher = FileHasher::new().with_buffer_size(config.hash_buffer_size);
        Self {
            inner: Arc::new(ManagerInner {
                store: DocumentStore::new(&config),
                mover: FileMover::new(config.files_dir(), hasher.clone()),
                verifier: IntegrityVerifier::new(hasher),
                document: Mutex::new(None),
                config,
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &QuarantineConfig {
        &self.inner.config
    }

    /// Returns `true` once `initialize` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Totals per status and bytes held.
    pub async fn stats(&self) -> QuarantineResult<QuarantineStats> {
        self.run(|inner| inner.with_document(|doc| Ok(stats_of(doc))))
            .await
    }

    /// Removes records older than the configured retention period.
    pub async fn clean_expired(&self) -> QuarantineResult<usize> {
        self.clean_quarantine(self.inner.config.retention_days).await
    }

    async fn run<T, F>(&self, f: F) -> QuarantineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ManagerInner) -> QuarantineResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| QuarantineError::internal(format!("quarantine task failed: {}", e)))?
    }
}

#[async_trait]
impl QuarantineStore for QuarantineManager {
    async fn initialize(&self) -> Result<(), QuarantineError> {
        self.run(|inner| inner.initialize()).await
    }

    async fn quarantine_file(
        &self,
        path: &Path,
        reason: QuarantineReason,
        metadata: Details,
    ) -> Result<QuarantineId, QuarantineError> {
        let path = path.to_path_buf();
        self.run(move |inner| inner.quarantine_file(&path, reason, metadata))
            .await
    }

    async fn list(&self, filter: QuarantineFilter) -> Result<Vec<QuarantineRecord>, QuarantineError> {
        self.run(move |inner| inner.with_document(|doc| Ok(filter.apply(doc.records()))))
            .await
    }

    async fn get_record(&self, id: &QuarantineId) -> Result<QuarantineRecord, QuarantineError> {
        let id = id.clone();
        self.run(move |inner| inner.with_document(|doc| doc.require(&id).cloned()))
            .await
    }

    async fn restore_file(
        &self,
        id: &QuarantineId,
        target: Option<&Path>,
    ) -> Result<PathBuf, QuarantineError> {
        let id = id.clone();
        let target = target.map(Path::to_path_buf);
        self.run(move |inner| inner.restore_file(&id, target)).await
    }

    async fn delete_quarantined_file(
        &self,
        id: &QuarantineId,
        permanent: bool,
    ) -> Result<(), QuarantineError> {
        let id = id.clone();
        self.run(move |inner| {
            if permanent {
                inner.purge(&id)
            } else {
                inner.soft_delete(&id)
            }
        })
        .await
    }

    async fn clean_quarantine(&self, days: u32) -> Result<usize, QuarantineError> {
        self.run(move |inner| inner.clean_at(days, Utc::now())).await
    }

    async fn verify_integrity(&self, id: &QuarantineId) -> Result<bool, QuarantineError> {
        let id = id.clone();
        self.run(move |inner| inner.verify_integrity(&id)).await
    }
}

impl ManagerInner {
    fn lock(&self) -> MutexGuard<'_, Option<StoreDocument>> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_document<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> QuarantineResult<T>,
    ) -> QuarantineResult<T> {
        let mut guard = self.lock();
        let doc = guard.as_mut().ok_or(QuarantineError::NotInitialized)?;
        f(doc)
    }

    /// Saves `doc`, running `undo` on it if the save fails.
    fn commit(
        &self,
        doc: &mut StoreDocument,
        undo: impl FnOnce(&mut StoreDocument),
    ) -> QuarantineResult<()> {
        if let Err(e) = self.store.save(doc) {
            undo(doc);
            return Err(e);
        }
        Ok(())
    }

    fn initialize(&self) -> QuarantineResult<()> {
        let mut guard = self.lock();
        if guard.is_some() {
            return Ok(());
        }

        let doc = self.store.initialize()?;
        create_private_dir(self.mover.files_dir())?;

        tracing::info!(
            base_dir = %self.config.base_dir.display(),
            records = doc.len(),
            "Quarantine manager initialized"
        );
        *guard = Some(doc);
        Ok(())
    }

    fn quarantine_file(
        &self,
        source: &Path,
        reason: QuarantineReason,
        metadata: Details,
    ) -> QuarantineResult<QuarantineId> {
        self.with_document(|doc| {
            let id = QuarantineId::new();
            let copy = self.mover.copy_to_quarantine(source, &id)?;
            let record = QuarantineRecord::new(
                id.clone(),
                copy.original_path,
                &copy.quarantine_path,
                reason,
                copy.hash.size,
                copy.hash.sha256,
            )
            .with_metadata(metadata);

            doc.insert(record.clone());
            if let Err(e) = self.commit(doc, |doc| {
                doc.remove(&id);
            }) {
                self.remove_copy(&copy.quarantine_path);
                return Err(e);
            }

            tracing::info!(
                quarantine_id = %id,
                source = %source.display(),
                reason = %reason,
                "File quarantined"
            );
            emit_quarantine_event(&record, QuarantineOperation::Quarantined);
            Ok(id)
        })
    }

    fn restore_file(&self, id: &QuarantineId, target: Option<PathBuf>) -> QuarantineResult<PathBuf> {
        self.with_document(|doc| {
            let previous = doc.require(id)?.clone();
            let target = target.unwrap_or_else(|| previous.original_path.clone());

            let mut updated = previous.clone();
            updated.mark_restored(&target)?;
            // Whatever sits at the target stays untouched until the save lands.
            let staged = self.mover.stage_out(&previous, &target)?;

            doc.insert(updated.clone());
            let rollback = previous.clone();
            if let Err(e) = self.commit(doc, |doc| {
                doc.insert(rollback);
            }) {
                staged.discard();
                return Err(e);
            }

            if let Err(e) = staged.persist() {
                tracing::error!(quarantine_id = %id, target = %target.display(), error = %e, "Failed to move restored file into place");
                doc.insert(previous);
                if let Err(save) = self.store.save(doc) {
                    tracing::error!(quarantine_id = %id, error = %save, "Failed to roll back restore in quarantine store");
                }
                return Err(e.into());
            }

            tracing::info!(quarantine_id = %id, target = %target.display(), "File restored from quarantine");
            emit_quarantine_event(&updated, QuarantineOperation::Restored);
            Ok(target)
        })
    }

    fn soft_delete(&self, id: &QuarantineId) -> QuarantineResult<()> {
        self.with_document(|doc| {
            let previous = doc.require(id)?.clone();
            let mut updated = previous.clone();
            updated.mark_deleted()?;

            doc.insert(updated.clone());
            self.commit(doc, |doc| {
                doc.insert(previous);
            })?;

            tracing::info!(quarantine_id = %id, "Quarantine record marked deleted");
            emit_quarantine_event(&updated, QuarantineOperation::Deleted);
            Ok(())
        })
    }

    fn purge(&self, id: &QuarantineId) -> QuarantineResult<()> {
        self.with_document(|doc| {
            let record = doc.remove(id).ok_or_else(|| QuarantineError::not_found(id))?;
            let restore = record.clone();
            self.commit(doc, |doc| {
                doc.insert(restore);
            })?;

            self.remove_copy(&record.quarantine_path);
            tracing::info!(quarantine_id = %id, "Quarantine record permanently deleted");
            emit_quarantine_event(&record, QuarantineOperation::Purged);
            Ok(())
        })
    }

    fn clean_at(&self, days: u32, now: DateTime<Utc>) -> QuarantineResult<usize> {
        self.with_document(|doc| {
            let sweeper = RetentionSweeper::new(days);
            let expired = sweeper.expired_ids(doc, now);
            if expired.is_empty() {
                return Ok(0);
            }

            let removed: Vec<QuarantineRecord> =
                expired.iter().filter_map(|id| doc.remove(id)).collect();
            let restore = removed.clone();
            self.commit(doc, |doc| {
                for record in restore {
                    doc.insert(record);
                }
            })?;

            for record in &removed {
                self.remove_copy(&record.quarantine_path);
                emit_quarantine_event(record, QuarantineOperation::Expired);
            }

            tracing::info!(
                removed = removed.len(),
                cutoff = %sweeper.cutoff(now),
                "Cleaned expired quarantine records"
            );
            Ok(removed.len())
        })
    }

    fn verify_integrity(&self, id: &QuarantineId) -> QuarantineResult<bool> {
        self.with_document(|doc| {
            let previous = doc.require(id)?.clone();

            let (expected, actual) = match self.verifier.verify(&previous)? {
                IntegrityVerdict::Intact => return Ok(true),
                IntegrityVerdict::Tampered { expected, actual } => (expected, actual),
            };

            tracing::warn!(
                quarantine_id = %id,
                expected_hash = %expected,
                actual_hash = %actual,
                "Quarantined file failed integrity check"
            );

            let mut updated = previous.clone();
            updated.record_integrity_failure(&expected, &actual);
            doc.insert(updated.clone());
            self.commit(doc, |doc| {
                doc.insert(previous);
            })?;

            emit_quarantine_event(&updated, QuarantineOperation::IntegrityFailed);
            Ok(false)
        })
    }

    fn remove_copy(&self, path: &Path) {
        match self.mover.remove_permanently(path) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(path = %path.display(), "Quarantined copy already absent")
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove quarantined copy")
            }
        }
    }
}

fn stats_of(doc: &StoreDocument) -> QuarantineStats {
    doc.records().fold(QuarantineStats::default(), |mut stats, record| {
        stats.total += 1;
        stats.total_bytes += record.file_size;
        match record.status {
            QuarantineStatus::Quarantined => stats.quarantined += 1,
            QuarantineStatus::Restored => stats.restored += 1,
            QuarantineStatus::Deleted => stats.deleted += 1,
        }
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Timestamp;
    use crate::quarantine::record::{HistoryAction, IntegrityResult};
    use chrono::{Duration, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        manager: QuarantineManager,
    }

    impl Fixture {
        async fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let manager = QuarantineManager::new(QuarantineConfig::new(tmp.path().join("quarantine")));
            manager.initialize().await.unwrap();
            Self { tmp, manager }
        }

        fn upload(&self, name: &str, content: &[u8]) -> PathBuf {
            let dir = self.tmp.path().join("uploads");
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(name);
            fs::write(&path, content).unwrap();
            path
        }

        async fn quarantine(&self, name: &str, content: &[u8]) -> QuarantineId {
            let path = self.upload(name, content);
            self.manager
                .quarantine_file(&path, QuarantineReason::Malware, Details::new())
                .await
                .unwrap()
        }

        /// Makes every save fail by putting a directory where the
        /// temporary document would be written.
        fn block_saves(&self) -> PathBuf {
            let config = self.manager.config();
            let blocker = config.base_dir().join(format!("{}.tmp", config.db_filename));
            fs::create_dir(&blocker).unwrap();
            blocker
        }

        fn db_bytes(&self) -> Vec<u8> {
            fs::read(self.manager.config().db_path()).unwrap()
        }

        fn on_disk(&self) -> serde_json::Value {
            serde_json::from_str(&fs::read_to_string(self.manager.config().db_path()).unwrap()).unwrap()
        }
    }

    #[tokio::test]
    async fn test_quarantine_restore_purge_lifecycle() {
        let fx = Fixture::new().await;
        let source = fx.upload("evil.txt", b"EICAR-like");

        let id = fx
            .manager
            .quarantine_file(&source, QuarantineReason::Malware, Details::new())
            .await
            .unwrap();

        let records = fx.manager.list(QuarantineFilter::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, id);
        assert_eq!(record.status, QuarantineStatus::Quarantined);
        assert_eq!(record.file_size, 10);
        let expected = crate::core::FileHasher::new().hash_bytes(b"EICAR-like");
        assert_eq!(record.file_hash.as_deref(), Some(expected.sha256.as_str()));

        let out = fx.tmp.path().join("out.txt");
        let restored = fx.manager.restore_file(&id, Some(&out)).await.unwrap();
        assert_eq!(restored, out);
        assert_eq!(fs::read(&out).unwrap(), b"EICAR-like");
        assert_eq!(
            fx.manager.get_record(&id).await.unwrap().status,
            QuarantineStatus::Restored
        );

        let copy = fx.manager.get_record(&id).await.unwrap().quarantine_path;
        fx.manager.delete_quarantined_file(&id, true).await.unwrap();
        assert!(fx.manager.get_record(&id).await.unwrap_err().is_not_found());
        assert!(!copy.exists());
        assert!(fx.on_disk()["files"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operations_before_initialize() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = QuarantineManager::new(QuarantineConfig::new(tmp.path()));
        assert!(!manager.is_initialized());

        let result = manager.list(QuarantineFilter::new()).await;
        assert!(matches!(result, Err(QuarantineError::NotInitialized)));
        // Construction does no I/O.
        assert!(!manager.config().db_path().exists());
    }

    #[tokio::test]
    async fn test_initialize_creates_layout_and_is_idempotent() {
        let fx = Fixture::new().await;
        let config = fx.manager.config();
        assert!(config.db_path().exists());
        assert!(config.files_dir().is_dir());
        fx.manager.initialize().await.unwrap();
        assert!(fx.manager.is_initialized());
    }

    #[tokio::test]
    async fn test_quarantine_file_persists_record() {
        let fx = Fixture::new().await;
        let source = fx.upload("evil.txt", b"X5O!P%@AP");
        let mut details = Details::new();
        details.insert("component".into(), "malware_scan".into());

        let id = fx
            .manager
            .quarantine_file(&source, QuarantineReason::Malware, details)
            .await
            .unwrap();

        let record = fx.manager.get_record(&id).await.unwrap();
        assert_eq!(record.status, QuarantineStatus::Quarantined);
        assert_eq!(record.original_filename, "evil.txt");
        assert_eq!(record.file_size, 9);
        assert_eq!(record.metadata["component"], "malware_scan");
        assert!(record.quarantine_path.exists());
        assert!(source.exists());
        let files_dir = fs::canonicalize(fx.manager.config().files_dir()).unwrap();
        assert_eq!(record.quarantine_path, files_dir.join(id.as_str()).join("evil.txt"));
        assert!(record.quarantine_path.is_absolute());

        let disk = fx.on_disk();
        assert_eq!(disk["files"][id.as_str()]["reason"], "malware");
        assert_eq!(disk["files"][id.as_str()]["history"][0]["action"], "quarantined");
        assert!(fx.manager.config().backup_path().exists());
    }

    #[tokio::test]
    async fn test_quarantine_missing_source_leaves_no_record() {
        let fx = Fixture::new().await;
        let err = fx
            .manager
            .quarantine_file(&fx.tmp.path().join("ghost.bin"), QuarantineReason::Manual, Details::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QuarantineError::SourceNotFound { .. }));
        assert_eq!(fx.manager.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_restore_roundtrip_hash_equality() {
        let fx = Fixture::new().await;
        let content: Vec<u8> = (0..200_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let id = fx.quarantine("blob.bin", &content).await;
        let recorded = fx.manager.get_record(&id).await.unwrap().file_hash.unwrap();

        let target = fx.tmp.path().join("restored/blob.bin");
        let restored_to = fx.manager.restore_file(&id, Some(&target)).await.unwrap();
        assert_eq!(restored_to, target);

        let restored_hash = FileHasher::new().hash_file(&target).unwrap().sha256;
        assert_eq!(restored_hash, recorded);

        let record = fx.manager.get_record(&id).await.unwrap();
        assert_eq!(record.status, QuarantineStatus::Restored);
        assert_eq!(record.restore_path, Some(target));
        assert_eq!(record.history.last().unwrap().action, HistoryAction::Restored);
    }

    #[tokio::test]
    async fn test_restore_defaults_to_original_path() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("doc.txt", b"keep me").await;
        let original = fx.manager.get_record(&id).await.unwrap().original_path;
        fs::remove_file(&original).unwrap();

        let restored = fx.manager.restore_file(&id, None).await.unwrap();
        assert_eq!(restored, original);
        assert_eq!(fs::read(&original).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_status_is_monotonic() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("a.txt", b"a").await;
        fx.manager
            .restore_file(&id, Some(&fx.tmp.path().join("out/a.txt")))
            .await
            .unwrap();

        let err = fx.manager.delete_quarantined_file(&id, false).await.unwrap_err();
        assert!(matches!(err, QuarantineError::InvalidTransition { .. }));
        let err = fx.manager.restore_file(&id, None).await.unwrap_err();
        assert!(matches!(err, QuarantineError::InvalidTransition { .. }));

        let id2 = fx.quarantine("b.txt", b"b").await;
        fx.manager.delete_quarantined_file(&id2, false).await.unwrap();
        let record = fx.manager.get_record(&id2).await.unwrap();
        assert_eq!(record.status, QuarantineStatus::Deleted);
        assert!(record.delete_time.is_some());
        // Soft delete keeps the copy.
        assert!(record.quarantine_path.exists());
        assert!(fx.manager.restore_file(&id2, None).await.is_err());
    }

    #[tokio::test]
    async fn test_permanent_delete_twice() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("gone.txt", b"bye").await;
        let record = fx.manager.get_record(&id).await.unwrap();

        fx.manager.delete_quarantined_file(&id, true).await.unwrap();
        assert!(!record.quarantine_path.exists());
        assert!(!fx.manager.config().files_dir().join(id.as_str()).exists());
        assert!(fx.on_disk()["files"].get(id.as_str()).is_none());

        let err = fx.manager.delete_quarantined_file(&id, true).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(fx.manager.get_record(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_permanent_delete_of_restored_record() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("r.txt", b"r").await;
        fx.manager
            .restore_file(&id, Some(&fx.tmp.path().join("out/r.txt")))
            .await
            .unwrap();
        fx.manager.delete_quarantined_file(&id, true).await.unwrap();
        assert_eq!(fx.manager.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_permanent_delete_with_missing_copy() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("m.txt", b"m").await;
        let record = fx.manager.get_record(&id).await.unwrap();
        fs::remove_file(&record.quarantine_path).unwrap();

        fx.manager.delete_quarantined_file(&id, true).await.unwrap();
        assert_eq!(fx.manager.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_verify_detects_tampering() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("t.txt", b"original bytes").await;
        assert!(fx.manager.verify_integrity(&id).await.unwrap());
        assert!(fx.manager.get_record(&id).await.unwrap().integrity_check.is_none());

        let path = fx.manager.get_record(&id).await.unwrap().quarantine_path;
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(false);
        fs::set_permissions(&path, perms).unwrap();
        fs::write(&path, b"modified bytes").unwrap();

        assert!(!fx.manager.verify_integrity(&id).await.unwrap());

        let record = fx.manager.get_record(&id).await.unwrap();
        let check = record.integrity_check.as_ref().unwrap();
        assert_eq!(check.result, IntegrityResult::Failed);
        assert_eq!(Some(&check.expected_hash), record.file_hash.as_ref());
        assert_ne!(check.actual_hash, check.expected_hash);
        assert_eq!(record.history.last().unwrap().action, HistoryAction::IntegrityFailed);
        assert_eq!(record.status, QuarantineStatus::Quarantined);
        assert_eq!(fx.on_disk()["files"][id.as_str()]["integrity_check"]["result"], "failed");
    }

    #[tokio::test]
    async fn test_verify_errors() {
        let fx = Fixture::new().await;
        let err = fx.manager.verify_integrity(&QuarantineId::from("nope")).await.unwrap_err();
        assert!(matches!(err, QuarantineError::NotFound { .. }));

        let id = fx.quarantine("v.txt", b"v").await;
        let path = fx.manager.get_record(&id).await.unwrap().quarantine_path;
        fs::remove_file(&path).unwrap();
        let err = fx.manager.verify_integrity(&id).await.unwrap_err();
        assert!(matches!(err, QuarantineError::MissingArtifact { .. }));
    }

    #[tokio::test]
    async fn test_clean_retention_boundary() {
        let fx = Fixture::new().await;
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let cutoff = now - Duration::days(30);

        let at_cutoff = fx.quarantine("at.txt", b"1").await;
        let older = fx.quarantine("old.txt", b"2").await;
        let recent = fx.quarantine("new.txt", b"3").await;
        {
            let mut guard = fx.manager.inner.lock();
            let doc = guard.as_mut().unwrap();
            doc.get_mut(&at_cutoff).unwrap().quarantine_time = Timestamp::from_datetime(cutoff);
            doc.get_mut(&older).unwrap().quarantine_time =
                Timestamp::from_datetime(cutoff - Duration::seconds(1));
            doc.get_mut(&recent).unwrap().quarantine_time =
                Timestamp::from_datetime(now - Duration::days(1));
        }
        let older_path = fx.manager.get_record(&older).await.unwrap().quarantine_path;

        let removed = fx.manager.inner.clean_at(30, now).unwrap();
        assert_eq!(removed, 1);
        assert!(fx.manager.get_record(&older).await.is_err());
        assert!(!older_path.exists());
        assert!(fx.manager.get_record(&at_cutoff).await.is_ok());
        assert!(fx.manager.get_record(&recent).await.is_ok());
        assert_eq!(fx.on_disk()["files"].as_object().unwrap().len(), 2);

        assert_eq!(fx.manager.inner.clean_at(30, now).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clean_expired_uses_configured_retention() {
        let fx = Fixture::new().await;
        fx.quarantine("fresh.txt", b"f").await;
        assert_eq!(fx.manager.clean_expired().await.unwrap(), 0);
        assert_eq!(fx.manager.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_filter_and_stats() {
        let fx = Fixture::new().await;
        let a = fx.quarantine("a.txt", b"aaaa").await;
        let b = fx.quarantine("b.txt", b"bb").await;
        let path_c = fx.upload("c.txt", b"c");
        fx.manager
            .quarantine_file(&path_c, QuarantineReason::SuspiciousPattern, Details::new())
            .await
            .unwrap();
        fx.manager.delete_quarantined_file(&b, false).await.unwrap();

        let quarantined = fx
            .manager
            .list(QuarantineFilter::new().with_status(QuarantineStatus::Quarantined))
            .await
            .unwrap();
        assert_eq!(quarantined.len(), 2);

        let patterns = fx
            .manager
            .list(QuarantineFilter::new().with_reason(QuarantineReason::SuspiciousPattern))
            .await
            .unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].original_filename, "c.txt");

        let hash_a = fx.manager.get_record(&a).await.unwrap().file_hash.unwrap();
        assert!(fx.manager.contains_hash(&hash_a).await.unwrap());

        let page = fx
            .manager
            .list(QuarantineFilter::new().with_pagination(2, 0))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let stats = fx.manager.stats().await.unwrap();
        assert_eq!(
            stats,
            QuarantineStats {
                total: 3,
                quarantined: 2,
                restored: 0,
                deleted: 1,
                total_bytes: 7,
            }
        );
    }

    #[tokio::test]
    async fn test_reload_from_disk() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("persist.txt", b"p").await;

        let reopened = QuarantineManager::new(fx.manager.config().clone());
        reopened.initialize().await.unwrap();
        let record = reopened.get_record(&id).await.unwrap();
        assert_eq!(record.original_filename, "persist.txt");
        assert!(reopened.verify_integrity(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_document_fails_initialize() {
        let tmp = tempfile::tempdir().unwrap();
        let config = QuarantineConfig::new(tmp.path());
        fs::write(config.db_path(), r#"{"metadata": {}}"#).unwrap();

        let manager = QuarantineManager::new(config);
        let err = manager.initialize().await.unwrap_err();
        assert!(matches!(err, QuarantineError::CorruptStore { .. }));
        assert!(!manager.is_initialized());
    }

    #[tokio::test]
    async fn test_concurrent_quarantines_all_persist() {
        let fx = Fixture::new().await;
        let mut handles = Vec::new();
        for i in 0..8 {
            let manager = fx.manager.clone();
            let path = fx.upload(&format!("f{}.txt", i), format!("file {}", i).as_bytes());
            handles.push(tokio::spawn(async move {
                manager
                    .quarantine_file(&path, QuarantineReason::Manual, Details::new())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fx.manager.count().await.unwrap(), 8);
        assert_eq!(fx.on_disk()["files"].as_object().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_unreadable_record_does_not_block_store() {
        let tmp = tempfile::tempdir().unwrap();
        let config = QuarantineConfig::new(tmp.path());
        fs::create_dir_all(config.files_dir()).unwrap();

        let mut good = QuarantineRecord::new(
            QuarantineId::from("good"),
            tmp.path().join("uploads/old.bin"),
            config.files_dir().join("good/old.bin"),
            QuarantineReason::Malware,
            4,
            "abcd",
        );
        good.quarantine_time = Timestamp::from_raw("2020-01-01T00:00:00Z");
        let mut doc = StoreDocument::empty();
        doc.insert(good);
        let mut value = serde_json::to_value(&doc).unwrap();
        value["files"]["bad"] = serde_json::json!({"id": "bad", "original_path": "/uploads/b.bin"});
        fs::write(config.db_path(), serde_json::to_vec(&value).unwrap()).unwrap();

        let manager = QuarantineManager::new(config.clone());
        manager.initialize().await.unwrap();
        assert_eq!(manager.count().await.unwrap(), 1);

        assert_eq!(manager.clean_quarantine(30).await.unwrap(), 1);
        assert_eq!(manager.count().await.unwrap(), 0);

        let disk: serde_json::Value =
            serde_json::from_slice(&fs::read(config.db_path()).unwrap()).unwrap();
        let files = disk["files"].as_object().unwrap();
        assert!(files.get("good").is_none());
        assert_eq!(files["bad"]["original_path"], "/uploads/b.bin");
    }

    #[tokio::test]
    async fn test_failed_save_quarantine_leaves_nothing() {
        let fx = Fixture::new().await;
        let source = fx.upload("x.txt", b"x");
        let blocker = fx.block_saves();
        let before = fx.db_bytes();

        let err = fx
            .manager
            .quarantine_file(&source, QuarantineReason::Malware, Details::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QuarantineError::PersistFailed { .. }));
        assert_eq!(fx.manager.count().await.unwrap(), 0);
        assert_eq!(fs::read_dir(fx.manager.config().files_dir()).unwrap().count(), 0);
        assert_eq!(fx.db_bytes(), before);
        assert!(source.exists());

        fs::remove_dir(&blocker).unwrap();
        fx.manager
            .quarantine_file(&source, QuarantineReason::Malware, Details::new())
            .await
            .unwrap();
        assert_eq!(fx.on_disk()["files"].as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_restore_keeps_existing_target() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("doc.txt", b"keep me").await;
        let original = fx.manager.get_record(&id).await.unwrap().original_path;
        fs::write(&original, b"edited since").unwrap();

        fx.block_saves();
        let before = fx.db_bytes();

        let err = fx.manager.restore_file(&id, None).await.unwrap_err();
        assert!(matches!(err, QuarantineError::PersistFailed { .. }));
        assert_eq!(fs::read(&original).unwrap(), b"edited since");
        // No staged file is left next to the target.
        assert_eq!(fs::read_dir(original.parent().unwrap()).unwrap().count(), 1);

        let target = fx.tmp.path().join("out/doc.txt");
        assert!(fx.manager.restore_file(&id, Some(&target)).await.is_err());
        assert!(!target.exists());

        let record = fx.manager.get_record(&id).await.unwrap();
        assert_eq!(record.status, QuarantineStatus::Quarantined);
        assert!(record.restore_path.is_none());
        assert_eq!(record.history.len(), 1);
        assert_eq!(fx.db_bytes(), before);
    }

    #[tokio::test]
    async fn test_failed_save_deletes_roll_back() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("d.txt", b"d").await;
        let copy = fx.manager.get_record(&id).await.unwrap().quarantine_path;
        fx.block_saves();
        let before = fx.db_bytes();

        let err = fx.manager.delete_quarantined_file(&id, false).await.unwrap_err();
        assert!(matches!(err, QuarantineError::PersistFailed { .. }));
        let record = fx.manager.get_record(&id).await.unwrap();
        assert_eq!(record.status, QuarantineStatus::Quarantined);
        assert!(record.delete_time.is_none());

        let err = fx.manager.delete_quarantined_file(&id, true).await.unwrap_err();
        assert!(matches!(err, QuarantineError::PersistFailed { .. }));
        assert!(fx.manager.get_record(&id).await.is_ok());
        assert!(copy.exists());
        assert_eq!(fx.db_bytes(), before);
    }

    #[tokio::test]
    async fn test_failed_save_clean_keeps_records() {
        let fx = Fixture::new().await;
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let id = fx.quarantine("old.txt", b"o").await;
        {
            let mut guard = fx.manager.inner.lock();
            let doc = guard.as_mut().unwrap();
            doc.get_mut(&id).unwrap().quarantine_time = Timestamp::from_datetime(now - Duration::days(90));
        }
        let copy = fx.manager.get_record(&id).await.unwrap().quarantine_path;
        fx.block_saves();
        let before = fx.db_bytes();

        let err = fx.manager.inner.clean_at(30, now).unwrap_err();
        assert!(matches!(err, QuarantineError::PersistFailed { .. }));
        assert!(fx.manager.get_record(&id).await.is_ok());
        assert!(copy.exists());
        assert_eq!(fx.db_bytes(), before);
    }

    #[tokio::test]
    async fn test_failed_save_verify_leaves_record_unannotated() {
        let fx = Fixture::new().await;
        let id = fx.quarantine("t.txt", b"original bytes").await;
        let path = fx.manager.get_record(&id).await.unwrap().quarantine_path;
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(false);
        fs::set_permissions(&path, perms).unwrap();
        fs::write(&path, b"modified bytes").unwrap();

        fx.block_saves();
        let before = fx.db_bytes();

        let err = fx.manager.verify_integrity(&id).await.unwrap_err();
        assert!(matches!(err, QuarantineError::PersistFailed { .. }));
        let record = fx.manager.get_record(&id).await.unwrap();
        assert!(record.integrity_check.is_none());
        assert_eq!(record.history.len(), 1);
        assert_eq!(fx.db_bytes(), before);
    }
}
