//! Retention manager: classifies history records as expired (age) or excess
//! (count) and drives cleanup. Operates on history records only; downloaded
//! archive files live in the operator's own file system.

use crate::client::SettingsStore;
use crate::history::{BackupHistory, BackupHistoryRecord};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Settings key for the age threshold, in days.
pub const MAX_AGE_KEY: &str = "retention.max_age_days";
/// Settings key for the count threshold.
pub const MAX_COUNT_KEY: &str = "retention.max_count";

const DEFAULT_MAX_AGE_DAYS: i64 = 30;
const DEFAULT_MAX_COUNT: usize = 10;

/// Age/count thresholds governing which past backups are eligible for cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_age_days: i64,
    pub max_count: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            max_count: DEFAULT_MAX_COUNT,
        }
    }
}

impl RetentionPolicy {
    /// Policy from the settings store, falling back to defaults per key.
    pub fn from_settings(settings: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        Self {
            max_age_days: settings
                .get(MAX_AGE_KEY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_age_days),
            max_count: settings
                .get(MAX_COUNT_KEY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_count),
        }
    }
}

/// Ids classified for cleanup. A record can appear in both sets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionReport {
    pub expired: BTreeSet<String>,
    pub excess: BTreeSet<String>,
}

impl RetentionReport {
    pub fn ids_to_remove(&self) -> BTreeSet<String> {
        self.expired.union(&self.excess).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.excess.is_empty()
    }
}

/// Classify history against the policy as of `now`.
///
/// `expired` holds records older than `max_age_days`; `excess` holds the
/// oldest records beyond `max_count` with history sorted newest first.
pub fn classify(
    history: &[BackupHistoryRecord],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionReport {
    let cutoff = now - Duration::days(policy.max_age_days);

    let expired: BTreeSet<String> = history
        .iter()
        .filter(|r| r.timestamp < cutoff)
        .map(|r| r.id.clone())
        .collect();

    let mut newest_first: Vec<&BackupHistoryRecord> = history.iter().collect();
    newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let excess: BTreeSet<String> = newest_first
        .into_iter()
        .skip(policy.max_count)
        .map(|r| r.id.clone())
        .collect();

    RetentionReport { expired, excess }
}

/// Drives classification and cleanup over the persisted history.
pub struct RetentionManager {
    history: BackupHistory,
    settings: Arc<dyn SettingsStore>,
}

impl RetentionManager {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            history: BackupHistory::new(settings.clone()),
            settings,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::from_settings(self.settings.as_ref())
    }

    /// Classify the current history against the stored policy.
    pub fn evaluate(&self) -> RetentionReport {
        classify(&self.history.list(), &self.policy(), Utc::now())
    }

    /// Remove the given record ids from history. Idempotent; returns how many
    /// records were actually removed.
    pub fn cleanup(&self, ids: &BTreeSet<String>) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.history.remove(id) {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "Retention cleanup removed backup history records");
        }
        removed
    }

    /// Evaluate and clean up in one pass.
    pub fn run(&self) -> usize {
        let report = self.evaluate();
        if report.is_empty() {
            return 0;
        }
        self.cleanup(&report.ids_to_remove())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemorySettings;
    use crate::history::BackupOrigin;

    fn record_at(hours_ago: i64) -> BackupHistoryRecord {
        let mut record = BackupHistoryRecord::new(BackupOrigin::Scheduled);
        record.timestamp = Utc::now() - Duration::hours(hours_ago);
        record.succeeded = true;
        record
    }

    #[test]
    fn old_records_classified_expired() {
        let policy = RetentionPolicy { max_age_days: 7, max_count: 100 };
        let fresh = record_at(24);
        let stale = record_at(24 * 10);
        let report = classify(&[fresh.clone(), stale.clone()], &policy, Utc::now());
        assert!(report.expired.contains(&stale.id));
        assert!(!report.expired.contains(&fresh.id));
        assert!(report.excess.is_empty());
    }

    #[test]
    fn surplus_records_classified_excess_oldest_first() {
        let policy = RetentionPolicy { max_age_days: 365, max_count: 2 };
        let newest = record_at(1);
        let middle = record_at(2);
        let oldest = record_at(3);
        // Deliberately unsorted input.
        let report = classify(
            &[middle.clone(), newest.clone(), oldest.clone()],
            &policy,
            Utc::now(),
        );
        assert_eq!(report.excess.len(), 1);
        assert!(report.excess.contains(&oldest.id));
    }

    #[test]
    fn record_can_be_expired_and_excess() {
        let policy = RetentionPolicy { max_age_days: 1, max_count: 1 };
        let newest = record_at(1);
        let old_surplus = record_at(24 * 5);
        let report = classify(&[newest, old_surplus.clone()], &policy, Utc::now());
        assert!(report.expired.contains(&old_surplus.id));
        assert!(report.excess.contains(&old_surplus.id));
        assert_eq!(report.ids_to_remove().len(), 1);
    }

    #[test]
    fn policy_reads_settings_with_defaults() {
        let settings = MemorySettings::new();
        assert_eq!(RetentionPolicy::from_settings(&settings), RetentionPolicy::default());

        settings.set(MAX_AGE_KEY, "14");
        settings.set(MAX_COUNT_KEY, "5");
        let policy = RetentionPolicy::from_settings(&settings);
        assert_eq!(policy.max_age_days, 14);
        assert_eq!(policy.max_count, 5);

        settings.set(MAX_COUNT_KEY, "not a number");
        assert_eq!(RetentionPolicy::from_settings(&settings).max_count, DEFAULT_MAX_COUNT);
    }

    #[test]
    fn manager_cleanup_is_idempotent() {
        let settings = Arc::new(MemorySettings::new());
        settings.set(MAX_AGE_KEY, "1");
        let manager = RetentionManager::new(settings.clone());

        let history = BackupHistory::new(settings);
        let stale = record_at(24 * 3);
        let stale_id = stale.id.clone();
        history.append(record_at(1));
        history.append(stale);

        assert_eq!(manager.run(), 1);
        assert_eq!(manager.run(), 0);
        assert!(history.list().iter().all(|r| r.id != stale_id));
    }
}
