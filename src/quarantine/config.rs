//! Configuration for the quarantine manager.

use crate::core::hasher::DEFAULT_BUFFER_SIZE;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where and how the quarantine manager keeps its state.
///
/// # Layout
///
/// ```text
/// <base_dir>/
/// ├── quarantine_db.json        # the document
/// ├── quarantine_db.json.bak    # previous document, refreshed on every save
/// └── files/
///     └── <id>/<original name>  # isolated copy, read-only
/// ```
///
/// Copies live one level down, under `files/`, rather than directly beside
/// the document, so the per-record directories never mix with the document
/// and its backup. Set `files_dir_name` to change that directory's name.
///
/// A relative `base_dir` is resolved against the working directory when a
/// file is quarantined. Persisted `quarantine_path` values are always
/// absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarantineConfig {
    /// Root directory of the store.
    pub base_dir: PathBuf,

    /// File name of the document inside `base_dir`.
    pub db_filename: String,

    /// Name of the directory holding isolated copies.
    pub files_dir_name: String,

    /// Age in days after which `clean_expired` removes a record.
    pub retention_days: u32,

    /// Read buffer size used when hashing.
    pub hash_buffer_size: usize,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data/quarantine"),
            db_filename: "quarantine_db.json".to_string(),
            files_dir_name: "files".to_string(),
            retention_days: 30,
            hash_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl QuarantineConfig {
    /// Creates a configuration rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the retention period in days.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Sets the document file name.
    pub fn with_db_filename(mut self, name: impl Into<String>) -> Self {
        self.db_filename = name.into();
        self
    }

    /// Sets the hashing buffer size.
    pub fn with_hash_buffer_size(mut self, size: usize) -> Self {
        self.hash_buffer_size = size;
        self
    }

    /// Root directory of the store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the document.
    pub fn db_path(&self) -> PathBuf {
        self.base_dir.join(&self.db_filename)
    }

    /// Path of the document backup.
    pub fn backup_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.bak", self.db_filename))
    }

    /// Directory holding the per-record subdirectories.
    pub fn files_dir(&self) -> PathBuf {
        self.base_dir.join(&self.files_dir_name)
    }
}
