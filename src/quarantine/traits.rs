//! Quarantine store trait definition.

use crate::core::error::QuarantineError;
use crate::core::Details;
use crate::quarantine::record::{
    QuarantineFilter, QuarantineId, QuarantineReason, QuarantineRecord, QuarantineStatus,
};

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Trait for quarantine storage implementations.
///
/// The security integrator only depends on this trait, so tests and
/// alternative backends can stand in for [`QuarantineManager`].
///
/// [`QuarantineManager`]: crate::quarantine::QuarantineManager
///
/// # Example Implementation
///
/// ```rust,ignore
/// use filesafe::quarantine::{QuarantineStore, QuarantineRecord, QuarantineId, QuarantineFilter, QuarantineReason};
/// use filesafe::core::{Details, QuarantineError};
/// use async_trait::async_trait;
/// use std::path::{Path, PathBuf};
///
/// #[derive(Debug)]
/// struct MyQuarantineStore {
///     // Your storage implementation
/// }
///
/// #[async_trait]
/// impl QuarantineStore for MyQuarantineStore {
///     async fn initialize(&self) -> Result<(), QuarantineError> {
///         Ok(())
///     }
///
///     async fn quarantine_file(
///         &self,
///         path: &Path,
///         reason: QuarantineReason,
///         metadata: Details,
///     ) -> Result<QuarantineId, QuarantineError> {
///         todo!()
///     }
///
///     // ... list, get_record, restore_file, delete_quarantined_file,
///     // clean_quarantine and verify_integrity
/// }
/// ```
#[async_trait]
pub trait QuarantineStore: Send + Sync + Debug {
    /// Prepares the store. Must succeed before any other call.
    async fn initialize(&self) -> Result<(), QuarantineError>;

    /// Copies the file at `path` into quarantine and records it.
    ///
    /// # Returns
    ///
    /// The unique ID assigned to this quarantine entry.
    async fn quarantine_file(
        &self,
        path: &Path,
        reason: QuarantineReason,
        metadata: Details,
    ) -> Result<QuarantineId, QuarantineError>;

    /// Lists records matching the filter, newest first.
    async fn list(&self, filter: QuarantineFilter) -> Result<Vec<QuarantineRecord>, QuarantineError>;

    /// Gets a single record.
    async fn get_record(&self, id: &QuarantineId) -> Result<QuarantineRecord, QuarantineError>;

    /// Copies a quarantined file back out.
    ///
    /// `target` defaults to the record's original path. Returns the path
    /// the file was restored to.
    async fn restore_file(
        &self,
        id: &QuarantineId,
        target: Option<&Path>,
    ) -> Result<PathBuf, QuarantineError>;

    /// Deletes a record.
    ///
    /// A soft delete only flags the record. A permanent delete removes the
    /// record, the isolated copy and its directory.
    async fn delete_quarantined_file(
        &self,
        id: &QuarantineId,
        permanent: bool,
    ) -> Result<(), QuarantineError>;

    /// Permanently removes records older than `days`. Returns how many.
    async fn clean_quarantine(&self, days: u32) -> Result<usize, QuarantineError>;

    /// Checks the isolated copy against its recorded digest.
    ///
    /// Returns `Ok(false)` when the copy was altered.
    async fn verify_integrity(&self, id: &QuarantineId) -> Result<bool, QuarantineError>;

    /// Returns the number of records.
    async fn count(&self) -> Result<usize, QuarantineError> {
        let records = self.list(QuarantineFilter::new()).await?;
        Ok(records.len())
    }

    /// Checks if a file with the given hash is already quarantined.
    async fn contains_hash(&self, hash: &str) -> Result<bool, QuarantineError> {
        let filter = QuarantineFilter::new()
            .with_file_hash(hash)
            .with_status(QuarantineStatus::Quarantined);
        let records = self.list(filter).await?;
        Ok(!records.is_empty())
    }
}
