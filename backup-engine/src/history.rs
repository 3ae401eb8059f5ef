//! Backup history: one record per completed or failed backup attempt.
//!
//! Records are persisted as a JSON array under a single settings key, newest
//! first, capped to bound growth. Removal is idempotent so retention cleanup
//! can re-run safely.

use crate::client::SettingsStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Settings key holding the serialized history array.
pub const HISTORY_KEY: &str = "backup.history";

/// Upper bound on persisted records; the oldest fall off first.
const MAX_RECORDS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupOrigin {
    Scheduled,
    Manual,
}

/// One backup attempt, kept for operator visibility and retention evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupHistoryRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub origin: BackupOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub duration_ms: u64,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackupHistoryRecord {
    pub fn new(origin: BackupOrigin) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            origin,
            filename: None,
            size_bytes: None,
            duration_ms: 0,
            succeeded: false,
            error: None,
        }
    }
}

/// History store over the injected settings provider.
pub struct BackupHistory {
    settings: Arc<dyn SettingsStore>,
}

impl BackupHistory {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<BackupHistoryRecord> {
        let Some(raw) = self.settings.get(HISTORY_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<BackupHistoryRecord>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Backup history is unreadable, starting fresh");
                Vec::new()
            }
        }
    }

    /// Prepend a record, trimming the store to its cap.
    pub fn append(&self, record: BackupHistoryRecord) {
        let mut records = self.list();
        records.insert(0, record);
        records.truncate(MAX_RECORDS);
        self.store(&records);
    }

    /// Remove by id. Removing an absent id is a no-op; returns whether a
    /// record was actually removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut records = self.list();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return false;
        }
        self.store(&records);
        true
    }

    fn store(&self, records: &[BackupHistoryRecord]) {
        match serde_json::to_string(records) {
            Ok(raw) => self.settings.set(HISTORY_KEY, &raw),
            Err(e) => warn!(error = %e, "Failed to persist backup history"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemorySettings;

    fn history() -> BackupHistory {
        BackupHistory::new(Arc::new(MemorySettings::new()))
    }

    #[test]
    fn append_and_list_newest_first() {
        let history = history();
        let mut first = BackupHistoryRecord::new(BackupOrigin::Manual);
        first.filename = Some("one".into());
        let mut second = BackupHistoryRecord::new(BackupOrigin::Scheduled);
        second.filename = Some("two".into());

        history.append(first);
        history.append(second);

        let records = history.list();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename.as_deref(), Some("two"));
        assert_eq!(records[0].origin, BackupOrigin::Scheduled);
    }

    #[test]
    fn remove_is_idempotent() {
        let history = history();
        let record = BackupHistoryRecord::new(BackupOrigin::Manual);
        let id = record.id.clone();
        history.append(record);

        assert!(history.remove(&id));
        assert!(!history.remove(&id));
        assert!(history.list().is_empty());
    }

    #[test]
    fn corrupt_history_starts_fresh() {
        let settings = Arc::new(MemorySettings::new());
        settings.set(HISTORY_KEY, "not json");
        let history = BackupHistory::new(settings);
        assert!(history.list().is_empty());
        history.append(BackupHistoryRecord::new(BackupOrigin::Manual));
        assert_eq!(history.list().len(), 1);
    }
}
