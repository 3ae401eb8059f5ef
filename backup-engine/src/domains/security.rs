//! Security domain: recent security events, active sessions, and the error
//! log, capped per collection. A failed read degrades that one collection to
//! an empty payload.

use super::DomainPayload;
use crate::client::DataClient;
use crate::error::Result;
use crate::tabular::TabularWriter;
use crate::types::BackupStats;
use chrono::Utc;
use serde_json::json;
use tracing::warn;

/// Marker entry for security backups; carries per-collection counts.
pub const METADATA_PATH: &str = "security/metadata";

/// `(collection, recency field)` pairs exported by this domain.
pub const SECURITY_COLLECTIONS: &[(&str, &str)] = &[
    ("security_events", "created_at"),
    ("user_sessions", "last_seen_at"),
    ("error_log", "logged_at"),
];

/// Most recent rows kept per collection.
pub const MAX_ROWS_PER_COLLECTION: usize = 1000;

pub async fn run(client: &dyn DataClient) -> Result<DomainPayload> {
    let mut entries = Vec::with_capacity(SECURITY_COLLECTIONS.len() + 1);
    let mut counts = serde_json::Map::new();
    let mut total_rows = 0u64;

    for (name, order_field) in SECURITY_COLLECTIONS {
        let rows = match client
            .read_recent(name, order_field, MAX_ROWS_PER_COLLECTION)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(collection = %name, error = %e, "Security read failed, recording empty payload");
                Vec::new()
            }
        };

        let mut writer = TabularWriter::new();
        writer.push_comment(&format!("collection: {name}"));
        writer.push_comment(&format!(
            "most recent {MAX_ROWS_PER_COLLECTION} rows by {order_field}"
        ));
        for row in &rows {
            writer.push(row);
        }

        counts.insert(name.to_string(), json!(rows.len()));
        total_rows += rows.len() as u64;
        entries.push((format!("security/{name}"), writer.finish()));
    }

    let summary = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "row_cap": MAX_ROWS_PER_COLLECTION,
        "counts": counts,
    });
    entries.insert(0, (METADATA_PATH.to_string(), serde_json::to_string_pretty(&summary)?));

    Ok(DomainPayload {
        entries,
        stats: BackupStats {
            collections: SECURITY_COLLECTIONS.len(),
            total_rows,
            duration_ms: 0,
        },
    })
}
