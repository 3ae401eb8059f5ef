//! Functions domain: static registry of the backend functions deployed with
//! the console. No external read; the deployment has no discovery endpoint,
//! so the list is kept in sync by hand.

use super::DomainPayload;
use crate::error::Result;
use crate::types::BackupStats;
use chrono::Utc;
use serde_json::json;

/// Marker entry for function-registry backups.
pub const METADATA_PATH: &str = "functions/metadata";

/// Backend function identifiers registered with the platform.
pub const REGISTERED_FUNCTIONS: &[&str] = &[
    "asset-import",
    "report-export",
    "notification-dispatch",
    "license-expiry-scan",
    "session-cleanup",
    "audit-rollup",
];

pub fn run() -> Result<DomainPayload> {
    let registry = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "count": REGISTERED_FUNCTIONS.len(),
        "functions": REGISTERED_FUNCTIONS,
    });

    Ok(DomainPayload {
        entries: vec![(METADATA_PATH.to_string(), serde_json::to_string_pretty(&registry)?)],
        stats: BackupStats::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_entry_lists_every_function() {
        let payload = run().unwrap();
        let (path, content) = &payload.entries[0];
        assert_eq!(path, METADATA_PATH);
        let doc: serde_json::Value = serde_json::from_str(content).unwrap();
        assert_eq!(doc["count"], REGISTERED_FUNCTIONS.len());
        assert_eq!(doc["functions"].as_array().unwrap().len(), REGISTERED_FUNCTIONS.len());
    }
}
