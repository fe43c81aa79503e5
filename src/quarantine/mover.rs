//! Copying files into and out of quarantine.

use crate::core::error::{QuarantineError, QuarantineResult};
use crate::core::{FileHash, FileHasher};
use crate::quarantine::permissions::{
    create_private_dir, set_mode, PRIVATE_FILE_MODE, READ_ONLY_MODE,
};
use crate::quarantine::record::{QuarantineId, QuarantineRecord};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A freshly made isolated copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedCopy {
    /// Absolute path of the source.
    pub original_path: PathBuf,
    /// Path of the copy.
    pub quarantine_path: PathBuf,
    /// Digest and size of the copy.
    pub hash: FileHash,
}

/// Moves bytes between the outside world and the quarantine area.
///
/// The source is never modified or removed; quarantine is a copy.
#[derive(Debug, Clone)]
pub struct FileMover {
    files_dir: PathBuf,
    hasher: FileHasher,
}

impl FileMover {
    /// Creates a mover rooted at `files_dir`.
    pub fn new(files_dir: impl Into<PathBuf>, hasher: FileHasher) -> Self {
        Self {
            files_dir: files_dir.into(),
            hasher,
        }
    }

    /// Directory holding the per-record subdirectories.
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Copies `source` to `<files_dir>/<id>/<name>` and makes the copy read-only.
    ///
    /// The copy keeps the source's modification time. On failure nothing is
    /// left behind.
    pub fn copy_to_quarantine(
        &self,
        source: &Path,
        id: &QuarantineId,
    ) -> QuarantineResult<IsolatedCopy> {
        let source_meta = fs::metadata(source).ok().filter(|m| m.is_file());
        let (Some(source_meta), Some(file_name)) = (source_meta, source.file_name()) else {
            return Err(QuarantineError::SourceNotFound {
                path: source.display().to_string(),
            });
        };
        let original_path = fs::canonicalize(source)?;
        let record_dir = self.files_dir.join(id.as_str());

        let result = create_private_dir(&record_dir)
            .and_then(|()| fs::canonicalize(&record_dir))
            .map_err(QuarantineError::from)
            .and_then(|dir| {
                let quarantine_path = dir.join(file_name);
                let hash = self.copy_into(source, &quarantine_path, source_meta.modified().ok())?;
                Ok((quarantine_path, hash))
            });

        match result {
            Ok((quarantine_path, hash)) => Ok(IsolatedCopy {
                original_path,
                quarantine_path,
                hash,
            }),
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&record_dir) {
                    tracing::warn!(
                        path = %record_dir.display(),
                        error = %cleanup,
                        "Failed to clean up partial quarantine copy"
                    );
                }
                Err(e)
            }
        }
    }

    fn copy_into(
        &self,
        source: &Path,
        dest: &Path,
        modified: Option<SystemTime>,
    ) -> QuarantineResult<FileHash> {
        fs::copy(source, dest)?;
        set_mode(dest, PRIVATE_FILE_MODE)?;
        if let Some(modified) = modified {
            preserve_mtime(dest, modified)?;
        }
        let hash = self.hasher.hash_file(dest)?;
        set_mode(dest, READ_ONLY_MODE)?;
        Ok(hash)
    }

    /// Copies the isolated copy of `record` to `target`, creating parent
    /// directories as needed. The restored file is private to the owner.
    /// Returns the number of bytes copied.
    pub fn copy_out(&self, record: &QuarantineRecord, target: &Path) -> QuarantineResult<u64> {
        let staged = self.stage_out(record, target)?;
        let bytes = staged.bytes();
        staged.persist()?;
        Ok(bytes)
    }

    /// Copies the isolated copy of `record` next to `target` without
    /// touching `target` itself.
    ///
    /// Nothing at `target` changes until [`StagedRestore::persist`]. On
    /// failure no staged file is left behind.
    pub fn stage_out(&self, record: &QuarantineRecord, target: &Path) -> QuarantineResult<StagedRestore> {
        let copy_meta = match fs::metadata(&record.quarantine_path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                return Err(QuarantineError::MissingArtifact {
                    id: record.id.to_string(),
                    path: record.quarantine_path.display().to_string(),
                })
            }
        };
        let Some(file_name) = target.file_name() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("restore target has no file name: {}", target.display()),
            )
            .into());
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut staging_name = std::ffi::OsString::from(".");
        staging_name.push(file_name);
        staging_name.push(format!(".{}.restore", record.id));
        let staging = target.with_file_name(staging_name);

        let copied = fs::copy(&record.quarantine_path, &staging).and_then(|bytes| {
            set_mode(&staging, PRIVATE_FILE_MODE)?;
            if let Ok(modified) = copy_meta.modified() {
                preserve_mtime(&staging, modified)?;
            }
            Ok(bytes)
        });

        match copied {
            Ok(bytes) => Ok(StagedRestore {
                staging,
                target: target.to_path_buf(),
                bytes,
            }),
            Err(e) => {
                let _ = fs::remove_file(&staging);
                Err(e.into())
            }
        }
    }

    /// Removes an isolated copy and its per-record directory.
    ///
    /// A missing copy is not an error. The directory is only removed when it
    /// sits directly under `files_dir`. Returns `true` if a file was removed.
    pub fn remove_permanently(&self, quarantine_path: &Path) -> std::io::Result<bool> {
        let removed = match fs::remove_file(quarantine_path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e),
        };

        if let Some(dir) = quarantine_path.parent() {
            if dir.exists() && self.is_record_dir(dir) {
                fs::remove_dir_all(dir)?;
            }
        }
        Ok(removed)
    }

    fn is_record_dir(&self, dir: &Path) -> bool {
        let Some(parent) = dir.parent() else {
            return false;
        };
        if parent == self.files_dir {
            return true;
        }
        match (fs::canonicalize(parent), fs::canonicalize(&self.files_dir)) {
            (Ok(parent), Ok(files_dir)) => parent == files_dir,
            _ => false,
        }
    }
}

/// A restored file written beside its target, waiting to be moved into place.
#[derive(Debug)]
#[must_use = "a staged restore must be persisted or discarded"]
pub struct StagedRestore {
    staging: PathBuf,
    target: PathBuf,
    bytes: u64,
}

impl StagedRestore {
    /// Size of the staged file.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Where the file will end up.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Renames the staged file over the target.
    pub fn persist(self) -> std::io::Result<PathBuf> {
        if let Err(e) = fs::rename(&self.staging, &self.target) {
            self.discard();
            return Err(e);
        }
        Ok(self.target)
    }

    /// Removes the staged file. The target is left as it was.
    pub fn discard(self) {
        if let Err(e) = fs::remove_file(&self.staging) {
            tracing::warn!(path = %self.staging.display(), error = %e, "Failed to remove staged restore");
        }
    }
}

fn preserve_mtime(path: &Path, modified: SystemTime) -> std::io::Result<()> {
    fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(modified)
}
