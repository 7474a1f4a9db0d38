//! Diagnostic report persistence.
//!
//! Persists `DiagnosticReport` records to a Sled DB, keyed by report id for
//! direct lookup. Values are JSON. Sled provides atomic per-key writes;
//! reports are immutable once inserted.

use std::path::Path;
use std::sync::Arc;

use crate::storage::StorageError;
use crate::types::DiagnosticReport;

/// Keyed store of diagnostic reports.
#[derive(Clone)]
pub struct ReportStore {
    db: Arc<sled::Db>,
}

impl ReportStore {
    /// Open or create the report store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Persist a report. Flushes so the record survives a crash.
    pub fn insert(&self, report: &DiagnosticReport) -> Result<(), StorageError> {
        let value = serde_json::to_vec(report)?;
        self.db.insert(report.report_id.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    /// Fetch a single report by id.
    pub fn get(&self, report_id: &str) -> Result<Option<DiagnosticReport>, StorageError> {
        match self.db.get(report_id.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All persisted reports, newest first.
    ///
    /// Undeserializable entries are skipped with a warning rather than
    /// failing the whole listing.
    pub fn list(&self) -> Result<Vec<DiagnosticReport>, StorageError> {
        let mut reports = Vec::with_capacity(self.db.len());

        for item in self.db.iter() {
            let (key, value) = item?;
            match serde_json::from_slice::<DiagnosticReport>(&value) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::warn!(
                        key = %String::from_utf8_lossy(&key),
                        "Skipping undeserializable report record: {}",
                        e
                    );
                }
            }
        }

        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    /// Delete a report record. Returns whether it existed.
    pub fn delete(&self, report_id: &str) -> Result<bool, StorageError> {
        let existed = self.db.remove(report_id.as_bytes())?.is_some();
        if existed {
            self.db.flush()?;
        }
        Ok(existed)
    }

    /// Total number of stored reports.
    pub fn count(&self) -> usize {
        self.db.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfidenceEntry, ImageRef};
    use chrono::{TimeZone, Utc};

    fn create_test_report(id: &str, minute: u32) -> DiagnosticReport {
        DiagnosticReport {
            report_id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap(),
            part: "impulsor".to_string(),
            state: "desgaste".to_string(),
            confidence_panel: vec![ConfidenceEntry {
                state: "desgaste".to_string(),
                confidence: "80.00%".to_string(),
            }],
            suggestion: "Test suggestion".to_string(),
            view_states: vec!["desgaste".to_string(); 5],
            images: vec![ImageRef {
                url: "http://localhost/x".to_string(),
                blob_key: "reports/x/view_1.png".to_string(),
            }],
        }
    }

    #[test]
    fn test_store_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(temp_dir.path().join("reports.db")).unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(temp_dir.path().join("reports.db")).unwrap();

        let report = create_test_report("r-1", 0);
        store.insert(&report).unwrap();

        assert_eq!(store.count(), 1);
        let fetched = store.get("r-1").unwrap().unwrap();
        assert_eq!(fetched, report);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(temp_dir.path().join("reports.db")).unwrap();

        store.insert(&create_test_report("r-old", 0)).unwrap();
        store.insert(&create_test_report("r-new", 30)).unwrap();
        store.insert(&create_test_report("r-mid", 15)).unwrap();

        let listed = store.list().unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.report_id.as_str()).collect();
        assert_eq!(ids, vec!["r-new", "r-mid", "r-old"]);
    }

    #[test]
    fn test_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(temp_dir.path().join("reports.db")).unwrap();

        store.insert(&create_test_report("r-1", 0)).unwrap();
        assert!(store.delete("r-1").unwrap());
        assert!(!store.delete("r-1").unwrap());
        assert_eq!(store.count(), 0);
        assert!(store.list().unwrap().is_empty());
    }
}
