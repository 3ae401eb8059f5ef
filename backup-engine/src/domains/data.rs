//! Data domain: snapshots the registered application collections.

use super::DomainPayload;
use crate::client::DataClient;
use crate::error::Result;
use crate::snapshot::SnapshotCollector;
use crate::types::BackupStats;
use chrono::Utc;
use serde_json::json;

/// Marker entry for data backups; carries collection and row totals.
pub const METADATA_PATH: &str = "data/metadata";

/// Comment marker opening the error line of a failed-snapshot entry. Restore
/// keys off it to tell failed snapshots from legitimately-empty ones.
pub const ERROR_MARKER: &str = "# error:";

/// Every collection registered with the console, security collections included.
pub const REGISTERED_COLLECTIONS: &[&str] = &[
    "staff",
    "assets",
    "asset_categories",
    "locations",
    "departments",
    "vendors",
    "licenses",
    "work_orders",
    "maintenance_logs",
    "security_events",
    "user_sessions",
    "error_log",
];

/// Collections never exported by the data domain: the security domain owns
/// them and caps their size separately.
pub const EXCLUDED_COLLECTIONS: &[&str] = &["security_events", "user_sessions", "error_log"];

/// The registered set minus the exclude list.
pub fn default_collections() -> Vec<String> {
    REGISTERED_COLLECTIONS
        .iter()
        .filter(|name| !EXCLUDED_COLLECTIONS.contains(*name))
        .map(|name| name.to_string())
        .collect()
}

/// Snapshot the configured collection set into one entry per collection plus
/// the `data/metadata` entry. Failed collections are recorded with an error
/// payload instead of aborting the batch.
pub async fn run<F>(
    client: &dyn DataClient,
    collections: Option<&[String]>,
    progress: F,
) -> Result<DomainPayload>
where
    F: FnMut(usize, usize, &str),
{
    let names: Vec<String> = match collections {
        Some(names) => names.to_vec(),
        None => default_collections(),
    };

    let collector = SnapshotCollector::new(client);
    let snapshots = collector.collect(&names, progress).await;

    let mut entries = Vec::with_capacity(names.len() + 1);
    let mut total_rows = 0u64;
    let mut failed = Vec::new();

    // Preserve the requested collection order in the entry list.
    for name in &names {
        let Some(snapshot) = snapshots.get(name) else {
            continue;
        };
        let content = match &snapshot.error {
            Some(error) => format!("# collection: {name}\n{ERROR_MARKER} {error}\n"),
            None => snapshot.payload.clone(),
        };
        if snapshot.failed() {
            failed.push(name.clone());
        }
        total_rows += snapshot.row_count;
        entries.push((format!("data/{name}"), content));
    }

    let metadata = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "collections": names.len(),
        "total_rows": total_rows,
        "failed": failed,
    });
    entries.push((METADATA_PATH.to_string(), serde_json::to_string_pretty(&metadata)?));

    Ok(DomainPayload {
        entries,
        stats: BackupStats {
            collections: names.len(),
            total_rows,
            duration_ms: 0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_excludes_security_collections() {
        let defaults = default_collections();
        assert!(defaults.iter().any(|n| n == "staff"));
        assert_eq!(defaults.len(), REGISTERED_COLLECTIONS.len() - EXCLUDED_COLLECTIONS.len());
        for excluded in EXCLUDED_COLLECTIONS {
            assert!(REGISTERED_COLLECTIONS.contains(excluded));
            assert!(!defaults.iter().any(|n| n == excluded));
        }
    }
}
