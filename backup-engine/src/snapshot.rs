//! Snapshot collector: pulls rows for named collections into tabular payloads.
//!
//! Collections are read in bounded pages and streamed straight into the
//! tabular encoder, so a large collection is encoded incrementally rather
//! than materialized as a row vector first. A read failure for one collection
//! degrades that collection to an error snapshot with an empty payload; the
//! remaining collections are still collected.

use crate::client::{DataClient, DEFAULT_PAGE_SIZE};
use crate::tabular::TabularWriter;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The extracted, serialized state of one collection at a point in time.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
    pub name: String,
    pub row_count: u64,
    pub payload: String,
    pub error: Option<String>,
}

impl CollectionSnapshot {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

pub struct SnapshotCollector<'a> {
    client: &'a dyn DataClient,
    page_size: usize,
}

impl<'a> SnapshotCollector<'a> {
    pub fn new(client: &'a dyn DataClient) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(client: &'a dyn DataClient, page_size: usize) -> Self {
        Self { client, page_size }
    }

    /// Snapshot every named collection, invoking `progress(current, total,
    /// name)` once per collection. Never returns early: a failed read is
    /// recorded as an error snapshot and collection continues.
    pub async fn collect<F>(
        &self,
        names: &[String],
        mut progress: F,
    ) -> BTreeMap<String, CollectionSnapshot>
    where
        F: FnMut(usize, usize, &str),
    {
        let total = names.len();
        let mut snapshots = BTreeMap::new();
        for (idx, name) in names.iter().enumerate() {
            progress(idx + 1, total, name);
            let snapshot = self.snapshot_one(name).await;
            if let Some(error) = &snapshot.error {
                warn!(collection = %name, error = %error, "Collection snapshot failed");
            } else {
                debug!(collection = %name, rows = snapshot.row_count, "Collection snapshot complete");
            }
            snapshots.insert(name.clone(), snapshot);
        }
        snapshots
    }

    async fn snapshot_one(&self, name: &str) -> CollectionSnapshot {
        let mut writer = TabularWriter::new();
        writer.push_comment(&format!("collection: {name}"));
        writer.push_comment(&format!("exported: {}", Utc::now().to_rfc3339()));

        let mut offset = 0usize;
        loop {
            match self.client.read_page(name, offset, self.page_size).await {
                Ok(page) => {
                    let fetched = page.len();
                    for row in &page {
                        writer.push(row);
                    }
                    offset += fetched;
                    if fetched < self.page_size {
                        break;
                    }
                }
                Err(e) => {
                    return CollectionSnapshot {
                        name: name.to_string(),
                        row_count: 0,
                        payload: String::new(),
                        error: Some(e.to_string()),
                    };
                }
            }
        }

        CollectionSnapshot {
            name: name.to_string(),
            row_count: writer.row_count(),
            payload: writer.finish(),
            error: None,
        }
    }
}
