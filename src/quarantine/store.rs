//! Loading and saving the quarantine document.

use crate::core::error::{QuarantineError, QuarantineResult};
use crate::quarantine::config::QuarantineConfig;
use crate::quarantine::document::StoreDocument;
use crate::quarantine::permissions::{create_private_dir, set_mode, PRIVATE_FILE_MODE};

use std::fs;
use std::path::{Path, PathBuf};

/// Reads and writes the JSON document and its backup.
///
/// Saves refresh `<db>.bak` from the current document, then write a
/// temporary sibling and rename it into place, so a crash never leaves a
/// half-written document behind.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    base_dir: PathBuf,
    db_path: PathBuf,
    backup_path: PathBuf,
}

impl DocumentStore {
    /// Creates a store for the paths in `config`. Does no I/O.
    pub fn new(config: &QuarantineConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            db_path: config.db_path(),
            backup_path: config.backup_path(),
        }
    }

    /// Path of the document.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Path of the backup.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Creates the base directory and loads the document, writing an empty
    /// one if none exists yet.
    pub fn initialize(&self) -> QuarantineResult<StoreDocument> {
        create_private_dir(&self.base_dir)?;

        if !self.db_path.exists() {
            let mut doc = StoreDocument::empty();
            self.save(&mut doc)?;
            tracing::info!(path = %self.db_path.display(), "Created quarantine store");
            return Ok(doc);
        }

        let doc = self.load()?;
        tracing::info!(
            path = %self.db_path.display(),
            records = doc.len(),
            "Loaded quarantine store"
        );
        Ok(doc)
    }

    /// Loads the document.
    ///
    /// An unreadable file or invalid JSON yields an empty document. JSON
    /// that parses but lacks the expected structure is an error, and the
    /// file on disk is left as it is.
    pub fn load(&self) -> QuarantineResult<StoreDocument> {
        let content = match fs::read_to_string(&self.db_path) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(
                    path = %self.db_path.display(),
                    error = %e,
                    "Failed to read quarantine store, starting empty"
                );
                return Ok(StoreDocument::empty());
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    path = %self.db_path.display(),
                    error = %e,
                    "Quarantine store is not valid JSON, starting empty"
                );
                return Ok(StoreDocument::empty());
            }
        };

        StoreDocument::from_value(value).map_err(|e| {
            tracing::error!(path = %self.db_path.display(), error = %e, "Quarantine store is corrupt");
            e
        })
    }

    /// Writes the document, stamping `last_updated`.
    ///
    /// On failure the document on disk is unchanged and `doc` keeps its
    /// previous `last_updated`.
    pub fn save(&self, doc: &mut StoreDocument) -> QuarantineResult<()> {
        if self.db_path.exists() {
            if let Err(e) = fs::copy(&self.db_path, &self.backup_path) {
                tracing::warn!(
                    path = %self.backup_path.display(),
                    error = %e,
                    "Failed to refresh quarantine store backup"
                );
            }
        }

        let previous = doc.metadata.last_updated.clone();
        doc.touch();

        if let Err(e) = self.write_atomic(doc) {
            doc.metadata.last_updated = previous;
            tracing::error!(path = %self.db_path.display(), error = %e, "Failed to save quarantine store");
            return Err(e);
        }

        tracing::debug!(path = %self.db_path.display(), records = doc.len(), "Saved quarantine store");
        Ok(())
    }

    fn write_atomic(&self, doc: &StoreDocument) -> QuarantineResult<()> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(persist_failed)?;
        let tmp_path = tmp_sibling(&self.db_path);

        let written = fs::write(&tmp_path, bytes)
            .and_then(|()| set_mode(&tmp_path, PRIVATE_FILE_MODE))
            .and_then(|()| fs::rename(&tmp_path, &self.db_path));

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(persist_failed(e));
        }
        Ok(())
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn persist_failed(e: impl std::fmt::Display) -> QuarantineError {
    QuarantineError::PersistFailed {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quarantine::record::{QuarantineId, QuarantineReason, QuarantineRecord};

    fn store_in(dir: &Path) -> DocumentStore {
        DocumentStore::new(&QuarantineConfig::new(dir))
    }

    #[test]
    fn test_initialize_creates_empty_document() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp.path().join("q"));

        let doc = store.initialize().unwrap();
        assert!(doc.is_empty());
        assert!(store.db_path().exists());
        // Nothing to back up on the first write.
        assert!(!store.backup_path().exists());
    }

    #[test]
    fn test_save_then_load_and_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let mut doc = store.initialize().unwrap();

        doc.insert(QuarantineRecord::new(
            QuarantineId::from("a"),
            "/uploads/a.txt",
            "/q/files/a/a.txt",
            QuarantineReason::Manual,
            1,
            "00",
        ));
        store.save(&mut doc).unwrap();

        assert!(store.backup_path().exists());
        let backup: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert!(backup["files"].as_object().unwrap().is_empty());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded, doc);
        assert!(!tmp.path().join("quarantine_db.json.tmp").exists());
    }

    #[test]
    fn test_invalid_json_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        fs::write(store.db_path(), "{ not json").unwrap();

        let doc = store.initialize().unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_structurally_invalid_document_is_rejected_and_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        fs::write(store.db_path(), r#"{"files": {}}"#).unwrap();

        let err = store.initialize().unwrap_err();
        assert!(matches!(err, QuarantineError::CorruptStore { .. }));
        assert_eq!(fs::read_to_string(store.db_path()).unwrap(), r#"{"files": {}}"#);
    }

    #[cfg(unix)]
    #[test]
    fn test_document_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.initialize().unwrap();
        let mode = fs::metadata(store.db_path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, PRIVATE_FILE_MODE);
    }
}
