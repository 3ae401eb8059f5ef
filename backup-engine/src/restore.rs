//! Restore pipeline: extracts an archive and destructively replaces target
//! collections.
//!
//! Every data payload is decoded and validated in a staging pass before the
//! first delete, so a malformed archive never touches live data. The
//! delete-then-insert sweep then runs per collection in order: a failure
//! aborts the remaining collections, best-effort re-inserts the failing
//! collection's captured pre-restore rows, and leaves collections restored
//! before the failure in their new state. There is no cross-collection
//! rollback.

use crate::archive;
use crate::client::DataClient;
use crate::domains::data;
use crate::error::Result;
use crate::tabular;
use crate::types::{display_name, PreviewStatus, Record, RestorePreviewItem, RestoreResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const DATA_PREFIX: &str = "data/";

pub struct RestorePipeline {
    client: Arc<dyn DataClient>,
}

struct StagedCollection {
    name: String,
    rows: Vec<Record>,
}

struct SweepOutcome {
    restored: Vec<String>,
    total_rows: u64,
    failure: Option<(String, String)>,
}

impl RestorePipeline {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self { client }
    }

    /// Inspect a candidate archive without touching the external client:
    /// one preview row per expected data collection, plus any extra data
    /// entries the archive carries.
    pub fn preview(blob: &[u8]) -> Result<Vec<RestorePreviewItem>> {
        let entries = archive::unpack(blob)?;
        let payloads = data_entries(&entries);

        let mut collections: Vec<String> = data::default_collections();
        for name in payloads.keys() {
            if !collections.contains(name) {
                collections.push(name.clone());
            }
        }
        let mut items = Vec::with_capacity(collections.len());
        for name in collections {
            let item = match payloads.get(&name) {
                None => RestorePreviewItem {
                    display_name: display_name(&name),
                    collection: name,
                    record_count: 0,
                    status: PreviewStatus::NotFound,
                    error: None,
                },
                Some(payload) => match tabular::decode(payload, None) {
                    Ok(rows) => RestorePreviewItem {
                        display_name: display_name(&name),
                        collection: name,
                        record_count: rows.len(),
                        status: PreviewStatus::Found,
                        error: None,
                    },
                    Err(e) => RestorePreviewItem {
                        display_name: display_name(&name),
                        collection: name,
                        record_count: 0,
                        status: PreviewStatus::Error,
                        error: Some(e.to_string()),
                    },
                },
            };
            items.push(item);
        }
        Ok(items)
    }

    /// Replace target collections with the archive's contents. When `targets`
    /// is given, only those collections are restored.
    pub async fn restore(&self, blob: &[u8], targets: Option<&[String]>) -> RestoreResult {
        let start = Instant::now();

        let staged = match self.stage(blob, targets) {
            Ok(staged) => staged,
            Err(e) => {
                error!(error = %e, "Restore aborted before any write");
                return RestoreResult {
                    success: false,
                    collections_restored: Vec::new(),
                    total_rows: 0,
                    failed_collection: None,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: Some(e.to_string()),
                };
            }
        };

        let outcome = self.sweep(staged).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome.failure {
            None => {
                info!(
                    collections = outcome.restored.len(),
                    rows = outcome.total_rows,
                    duration_ms,
                    "Restore complete"
                );
                RestoreResult {
                    success: true,
                    collections_restored: outcome.restored,
                    total_rows: outcome.total_rows,
                    failed_collection: None,
                    duration_ms,
                    error: None,
                }
            }
            Some((collection, message)) => {
                error!(
                    collection = %collection,
                    error = %message,
                    restored = outcome.restored.len(),
                    "Restore aborted; earlier collections remain replaced"
                );
                RestoreResult {
                    success: false,
                    collections_restored: outcome.restored,
                    total_rows: outcome.total_rows,
                    failed_collection: Some(collection.clone()),
                    duration_ms,
                    error: Some(format!("restore of '{collection}' failed: {message}")),
                }
            }
        }
    }

    /// Decode every targeted payload up front; no write happens unless all
    /// payloads are known-good.
    fn stage(&self, blob: &[u8], targets: Option<&[String]>) -> Result<Vec<StagedCollection>> {
        let entries = archive::unpack(blob)?;
        let payloads = data_entries(&entries);

        let mut staged = Vec::new();
        for (name, payload) in payloads {
            if let Some(targets) = targets {
                if !targets.iter().any(|t| t == &name) {
                    continue;
                }
            }
            if !tabular::has_header(payload) {
                // Failed snapshots and empty collections both render without a
                // header; only the former carries the error marker. An empty
                // snapshot still stages so the delete clears the target.
                if payload.lines().any(|l| l.starts_with(data::ERROR_MARKER)) {
                    warn!(collection = %name, "Skipping collection whose snapshot failed at backup time");
                    continue;
                }
                staged.push(StagedCollection { name, rows: Vec::new() });
                continue;
            }
            let rows = tabular::decode(payload, None).map_err(|e| crate::error::EngineError::Restore {
                collection: name.clone(),
                message: e.to_string(),
            })?;
            staged.push(StagedCollection { name, rows });
        }
        Ok(staged)
    }

    async fn sweep(&self, staged: Vec<StagedCollection>) -> SweepOutcome {
        let mut restored = Vec::new();
        let mut total_rows = 0u64;

        for collection in staged {
            let name = collection.name;

            // Captured for best-effort recovery if this collection's own
            // insert fails after its delete.
            let prior = match self.client.read_all(&name).await {
                Ok(rows) => Some(rows),
                Err(e) => {
                    warn!(collection = %name, error = %e, "Could not capture pre-restore rows");
                    None
                }
            };

            if let Err(e) = self.client.delete_all(&name).await {
                return SweepOutcome {
                    restored,
                    total_rows,
                    failure: Some((name, e.to_string())),
                };
            }

            match self.client.insert_many(&name, &collection.rows).await {
                Ok(inserted) => {
                    info!(collection = %name, rows = inserted, "Collection replaced");
                    total_rows += inserted;
                    restored.push(name);
                }
                Err(e) => {
                    if let Some(prior) = prior {
                        match self.client.insert_many(&name, &prior).await {
                            Ok(_) => {
                                warn!(collection = %name, "Re-inserted pre-restore rows after failed insert")
                            }
                            Err(restore_err) => error!(
                                collection = %name,
                                error = %restore_err,
                                "Failed to re-insert pre-restore rows; collection left empty"
                            ),
                        }
                    }
                    return SweepOutcome {
                        restored,
                        total_rows,
                        failure: Some((name, e.to_string())),
                    };
                }
            }
        }

        SweepOutcome {
            restored,
            total_rows,
            failure: None,
        }
    }
}

/// Data-domain payloads by collection name, excluding the metadata entry.
fn data_entries(entries: &BTreeMap<String, String>) -> BTreeMap<String, &String> {
    entries
        .iter()
        .filter(|(path, _)| path.starts_with(DATA_PREFIX) && path.as_str() != data::METADATA_PATH)
        .map(|(path, content)| (path[DATA_PREFIX.len()..].to_string(), content))
        .collect()
}
