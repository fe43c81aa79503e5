//! The persisted quarantine document.

use crate::core::error::{QuarantineError, QuarantineResult};
use crate::core::Timestamp;
use crate::quarantine::record::{QuarantineId, QuarantineRecord};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Schema version written into new documents.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Document header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// When the document was first created.
    pub created_at: Timestamp,
    /// When the document was last written.
    pub last_updated: Timestamp,
    /// Schema version.
    pub version: String,
}

/// Every record the manager knows about, keyed by id.
///
/// Entries under `files` that do not decode as records are kept verbatim
/// and written back on save. They are invisible to every query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDocument {
    /// Document header.
    pub metadata: StoreMetadata,
    /// Records keyed by quarantine id.
    pub files: BTreeMap<QuarantineId, QuarantineRecord>,
    unreadable: BTreeMap<String, serde_json::Value>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for StoreDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StoreDocument", 2)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.serialize_field("files", &FilesView(self))?;
        state.end()
    }
}

struct FilesView<'a>(&'a StoreDocument);

impl Serialize for FilesView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let records = self
            .0
            .files
            .iter()
            .map(|(id, record)| (id.as_str(), serde_json::to_value(record)));
        let raw = self
            .0
            .unreadable
            .iter()
            .map(|(key, value)| (key.as_str(), Ok(value.clone())));

        let mut entries = Vec::with_capacity(self.0.files.len() + self.0.unreadable.len());
        for (key, value) in records.chain(raw) {
            entries.push((key, value.map_err(<S::Error as serde::ser::Error>::custom)?));
        }
        entries.sort_by(|a, b| a.0.cmp(b.0));
        serializer.collect_map(entries)
    }
}

impl<'de> Deserialize<'de> for StoreDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl StoreDocument {
    /// Creates an empty document stamped with the current time.
    pub fn empty() -> Self {
        let now = Timestamp::now();
        Self {
            metadata: StoreMetadata {
                created_at: now.clone(),
                last_updated: now,
                version: DOCUMENT_VERSION.to_string(),
            },
            files: BTreeMap::new(),
            unreadable: BTreeMap::new(),
        }
    }

    /// Decodes a document from parsed JSON.
    ///
    /// Both top-level objects must be present and the header must decode;
    /// otherwise the result is [`QuarantineError::CorruptStore`]. Records are
    /// decoded one by one. A record that fails is logged and set aside.
    pub fn from_value(value: serde_json::Value) -> QuarantineResult<Self> {
        let serde_json::Value::Object(mut obj) = value else {
            return Err(QuarantineError::CorruptStore {
                reason: "top level is not an object".to_string(),
            });
        };
        let (Some(metadata), Some(serde_json::Value::Object(entries))) =
            (obj.remove("metadata").filter(|v| v.is_object()), obj.remove("files"))
        else {
            return Err(QuarantineError::CorruptStore {
                reason: "missing 'metadata' or 'files' object".to_string(),
            });
        };

        let metadata: StoreMetadata =
            serde_json::from_value(metadata).map_err(|e| QuarantineError::CorruptStore {
                reason: format!("invalid metadata: {}", e),
            })?;

        let mut files = BTreeMap::new();
        let mut unreadable = BTreeMap::new();
        for (key, entry) in entries {
            match serde_json::from_value::<QuarantineRecord>(entry.clone()) {
                Ok(record) => {
                    files.insert(QuarantineId::from(key), record);
                }
                Err(e) => {
                    tracing::warn!(quarantine_id = %key, error = %e, "Skipping unreadable quarantine record");
                    unreadable.insert(key, entry);
                }
            }
        }

        Ok(Self {
            metadata,
            files,
            unreadable,
        })
    }

    /// Ids of entries that could not be decoded.
    pub fn unreadable_ids(&self) -> impl Iterator<Item = &str> {
        self.unreadable.keys().map(String::as_str)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the document holds no records.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Looks up a record.
    pub fn get(&self, id: &QuarantineId) -> Option<&QuarantineRecord> {
        self.files.get(id)
    }

    /// Looks up a record for mutation.
    pub fn get_mut(&mut self, id: &QuarantineId) -> Option<&mut QuarantineRecord> {
        self.files.get_mut(id)
    }

    /// Looks up a record or fails with `NotFound`.
    pub fn require(&self, id: &QuarantineId) -> QuarantineResult<&QuarantineRecord> {
        self.files.get(id).ok_or_else(|| QuarantineError::not_found(id))
    }

    /// Inserts or replaces a record.
    pub fn insert(&mut self, record: QuarantineRecord) -> Option<QuarantineRecord> {
        self.unreadable.remove(record.id.as_str());
        self.files.insert(record.id.clone(), record)
    }

    /// Removes a record.
    pub fn remove(&mut self, id: &QuarantineId) -> Option<QuarantineRecord> {
        self.files.remove(id)
    }

    /// Iterates over the records.
    pub fn records(&self) -> impl Iterator<Item = &QuarantineRecord> {
        self.files.values()
    }

    /// Updates `last_updated` to now.
    pub fn touch(&mut self) {
        self.metadata.last_updated = Timestamp::now();
    }
}
