//! Shared types for backup and restore operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of a collection: field name to JSON value, in field order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Manifest format version written into full-backup archives.
pub const FORMAT_VERSION: u32 = 1;

/// Which domain(s) a given archive covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Full,
    Data,
    Configuration,
    Security,
    Functions,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Full => "full",
            BackupType::Data => "data",
            BackupType::Configuration => "configuration",
            BackupType::Security => "security",
            BackupType::Functions => "functions",
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counters for one backup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupStats {
    pub collections: usize,
    pub total_rows: u64,
    pub duration_ms: u64,
}

impl BackupStats {
    pub fn merge(&mut self, other: &BackupStats) {
        self.collections += other.collections;
        self.total_rows += other.total_rows;
    }
}

/// Manifest written as the root `backup-info` entry of a full backup.
/// Never mutated after creation; `entries` is never empty on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub backup_type: BackupType,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<String>,
    pub stats: BackupStats,
    pub format_version: u32,
}

/// Outcome of one orchestrated backup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupResult {
    pub success: bool,
    pub filename: Option<String>,
    pub size_bytes: Option<u64>,
    pub backup_type: BackupType,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Per-collection status when inspecting a candidate archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    Found,
    NotFound,
    Error,
}

/// One row per expected data collection in a restore preview.
/// Built fresh on every inspection, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorePreviewItem {
    pub collection: String,
    pub display_name: String,
    pub record_count: usize,
    pub status: PreviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one restore run. Collections restored before a failure
/// remain restored; `failed_collection` names the one that aborted the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResult {
    pub success: bool,
    pub collections_restored: Vec<String>,
    pub total_rows: u64,
    pub failed_collection: Option<String>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Human-readable collection name for preview rows ("work_orders" -> "Work Orders").
pub fn display_name(collection: &str) -> String {
    collection
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&BackupType::Full).unwrap(), "\"full\"");
        let parsed: BackupType = serde_json::from_str("\"security\"").unwrap();
        assert_eq!(parsed, BackupType::Security);
    }

    #[test]
    fn display_name_title_cases_separators() {
        assert_eq!(display_name("staff"), "Staff");
        assert_eq!(display_name("work_orders"), "Work Orders");
        assert_eq!(display_name("error-log"), "Error Log");
    }

    #[test]
    fn stats_merge_sums_counters() {
        let mut a = BackupStats { collections: 2, total_rows: 10, duration_ms: 0 };
        let b = BackupStats { collections: 1, total_rows: 5, duration_ms: 99 };
        a.merge(&b);
        assert_eq!(a.collections, 3);
        assert_eq!(a.total_rows, 15);
    }
}
