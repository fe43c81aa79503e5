//! Core types used throughout the filesafe library.
//!
//! This module defines timestamps as they are persisted, free-form detail
//! maps, adapter verdicts and the fixed set of adapter slots.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form key/value details attached to verdicts and records.
pub type Details = serde_json::Map<String, serde_json::Value>;

/// An ISO-8601 timestamp as stored in the quarantine document.
///
/// The raw string is kept verbatim so a record with a malformed time still
/// loads and round-trips; [`Timestamp::to_datetime`] parses on demand.
/// RFC 3339 strings and naive `YYYY-MM-DDTHH:MM:SS[.f]` strings (read as UTC)
/// are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Returns the current time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Formats a UTC time as RFC 3339 with microsecond precision.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Wraps a raw string without validating it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the timestamp, returning `None` if it is malformed.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.0) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.0, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The verdict an adapter returns for one file.
///
/// `clean` is the adapter's pass/fail answer. `sanitized` is set by adapters
/// that rewrote the file to remove the problem (metadata stripping); such an
/// outcome does not make the file insecure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Whether the adapter considers the file safe.
    pub clean: bool,

    /// Whether the adapter repaired the file in place.
    #[serde(default)]
    pub sanitized: bool,

    /// Adapter-specific details (matches, scores, removed fields).
    #[serde(default)]
    pub details: Details,
}

impl ScanOutcome {
    /// A clean verdict with no details.
    pub fn clean() -> Self {
        Self {
            clean: true,
            sanitized: false,
            details: Details::new(),
        }
    }

    /// A verdict flagging the file as unsafe.
    pub fn flagged(details: Details) -> Self {
        Self {
            clean: false,
            sanitized: false,
            details,
        }
    }

    /// A verdict for a file the adapter repaired in place.
    pub fn sanitized(details: Details) -> Self {
        Self {
            clean: true,
            sanitized: true,
            details,
        }
    }

    /// Adds a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if the file should be treated as unsafe.
    pub fn is_unsafe(&self) -> bool {
        !self.clean && !self.sanitized
    }
}

/// The adapter slots, in the order a scan runs them.
///
/// Serializes as the component name, and orders by scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdapterKind {
    /// Malware engine (ClamAV or similar).
    #[serde(rename = "malware_scan")]
    Malware,
    /// Pattern analyzer (YARA or similar).
    #[serde(rename = "pattern_analysis")]
    Pattern,
    /// Metadata sanitizer; may rewrite the file.
    #[serde(rename = "metadata_sanitization")]
    Metadata,
    /// Content filter (moderation).
    #[serde(rename = "content_filtering")]
    Content,
}

impl AdapterKind {
    /// Fixed scan order.
    pub const ORDER: [AdapterKind; 4] = [Self::Malware, Self::Pattern, Self::Metadata, Self::Content];

    /// Key under which the outcome is reported in a scan report.
    pub fn component_name(&self) -> &'static str {
        match self {
            Self::Malware => "malware_scan",
            Self::Pattern => "pattern_analysis",
            Self::Metadata => "metadata_sanitization",
            Self::Content => "content_filtering",
        }
    }

    /// Position of this kind in [`AdapterKind::ORDER`].
    pub fn index(&self) -> usize {
        match self {
            Self::Malware => 0,
            Self::Pattern => 1,
            Self::Metadata => 2,
            Self::Content => 3,
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.component_name())
    }
}
