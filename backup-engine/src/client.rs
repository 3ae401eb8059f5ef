//! External collaborators consumed by the engine.
//!
//! The engine never reaches into ambient globals: the relational data client,
//! the persisted settings store, and the host file-save primitive are all
//! injected at construction time.

use crate::error::Result;
use crate::types::Record;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Page size used when materializing a collection through `read_page`.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Asynchronous client for the external relational data store.
///
/// All operations may fail with a descriptive error; the engine awaits each
/// call before proceeding and imposes no internal timeout.
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Read up to `limit` rows starting at `offset`, in stable order.
    async fn read_page(&self, collection: &str, offset: usize, limit: usize) -> Result<Vec<Record>>;

    /// Read the most recent `limit` rows ordered by `order_field` descending.
    async fn read_recent(&self, collection: &str, order_field: &str, limit: usize) -> Result<Vec<Record>>;

    /// Delete every row of the collection. Returns the number removed.
    async fn delete_all(&self, collection: &str) -> Result<u64>;

    /// Bulk-insert rows. Returns the number inserted.
    async fn insert_many(&self, collection: &str, rows: &[Record]) -> Result<u64>;

    /// Exact row count of the collection.
    async fn count_exact(&self, collection: &str) -> Result<u64>;

    /// Read every row of the collection in bounded pages.
    async fn read_all(&self, collection: &str) -> Result<Vec<Record>> {
        let mut rows = Vec::new();
        loop {
            let page = self.read_page(collection, rows.len(), DEFAULT_PAGE_SIZE).await?;
            let fetched = page.len();
            rows.extend(page);
            if fetched < DEFAULT_PAGE_SIZE {
                break;
            }
        }
        Ok(rows)
    }
}

/// Local persisted key/value settings store.
///
/// Backs the configuration backup module, backup history, and the retention
/// policy source.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    /// Every stored key/value pair, in key order.
    fn entries(&self) -> Vec<(String, String)>;
}

/// Host file-save primitive: hands a finished archive blob to the environment.
/// Fire-and-forget from the engine's point of view.
pub trait FileSaver: Send + Sync {
    fn save(&self, filename: &str, blob: &[u8]) -> Result<()>;
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.values
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// File saver that writes archives into a local directory.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, filename: &str, blob: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, blob)?;
        tracing::info!(path = %path.display(), bytes = blob.len(), "Saved backup archive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_settings_get_set_remove() {
        let store = MemorySettings::new();
        assert_eq!(store.get("a"), None);
        store.set("a", "1");
        store.set("b", "2");
        assert_eq!(store.get("a").as_deref(), Some("1"));
        assert_eq!(store.entries(), vec![("a".into(), "1".into()), ("b".into(), "2".into())]);
        store.remove("a");
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn directory_saver_writes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DirectorySaver::new(dir.path());
        saver.save("full-backup-test.tar.zst", b"blob").unwrap();
        let written = std::fs::read(dir.path().join("full-backup-test.tar.zst")).unwrap();
        assert_eq!(written, b"blob");
    }
}
