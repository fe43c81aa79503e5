//! Age-based expiry of quarantine records.

use crate::quarantine::document::StoreDocument;
use crate::quarantine::record::QuarantineId;

use chrono::{DateTime, Duration, Utc};

/// Selects records older than a retention period.
///
/// A record expires when its quarantine time is strictly before
/// `now - days`. Status does not matter. Records whose time cannot be
/// parsed are kept and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionSweeper {
    days: u32,
}

impl RetentionSweeper {
    /// Creates a sweeper for a retention period of `days`.
    pub fn new(days: u32) -> Self {
        Self { days }
    }

    /// Retention period in days.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// The instant before which records expire.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.days))
    }

    /// Ids of the records in `doc` that have expired as of `now`.
    pub fn expired_ids(&self, doc: &StoreDocument, now: DateTime<Utc>) -> Vec<QuarantineId> {
        let cutoff = self.cutoff(now);
        doc.records()
            .filter(|record| match record.quarantined_at() {
                Some(at) => at < cutoff,
                None => {
                    tracing::warn!(
                        quarantine_id = %record.id,
                        quarantine_time = %record.quarantine_time,
                        "Skipping record with unparsable quarantine time"
                    );
                    false
                }
            })
            .map(|record| record.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Timestamp;
    use crate::quarantine::record::{QuarantineReason, QuarantineRecord, QuarantineStatus};
    use chrono::TimeZone;

    fn doc_with(times: &[(&str, Timestamp)]) -> StoreDocument {
        let mut doc = StoreDocument::empty();
        for (id, time) in times {
            let mut record = QuarantineRecord::new(
                QuarantineId::from(*id),
                "/uploads/f",
                "/q/files/f",
                QuarantineReason::Manual,
                0,
                "",
            );
            record.quarantine_time = time.clone();
            doc.insert(record);
        }
        doc
    }

    #[test]
    fn test_cutoff_boundary_is_strict() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let sweeper = RetentionSweeper::new(30);
        let cutoff = sweeper.cutoff(now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());

        let doc = doc_with(&[
            ("exactly", Timestamp::from_datetime(cutoff)),
            ("older", Timestamp::from_datetime(cutoff - Duration::microseconds(1))),
            ("newer", Timestamp::from_datetime(cutoff + Duration::seconds(1))),
            ("naive-old", Timestamp::from_raw("2025-06-01T00:00:00.000001")),
            ("garbage", Timestamp::from_raw("last tuesday")),
        ]);

        let mut expired = sweeper.expired_ids(&doc, now);
        expired.sort();
        assert_eq!(expired, vec![QuarantineId::from("naive-old"), QuarantineId::from("older")]);
    }

    #[test]
    fn test_status_does_not_matter() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let old = Timestamp::from_raw("2020-01-01T00:00:00Z");
        let mut doc = doc_with(&[("a", old.clone()), ("b", old)]);
        doc.get_mut(&QuarantineId::from("b")).unwrap().status = QuarantineStatus::Restored;

        assert_eq!(RetentionSweeper::new(30).expired_ids(&doc, now).len(), 2);
    }

    #[test]
    fn test_zero_days_expires_everything_in_the_past() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let doc = doc_with(&[("a", Timestamp::from_datetime(now - Duration::seconds(1)))]);
        assert_eq!(RetentionSweeper::new(0).expired_ids(&doc, now).len(), 1);
    }
}
