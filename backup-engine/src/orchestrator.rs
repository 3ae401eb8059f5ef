//! Backup orchestrator: coordinates domain modules into a single archive.
//!
//! Selective backups dispatch to exactly one domain module; full backups run
//! all four in sequence (data, configuration, functions, security) and add a
//! root manifest entry aggregating their stats. The orchestrator never
//! retries; per-unit tolerance lives inside the modules. Callers must
//! serialize concurrent backup/restore runs against the same collections
//! themselves.

use crate::archive::{self, PackOptions, ARCHIVE_EXT};
use crate::client::{DataClient, FileSaver, SettingsStore};
use crate::domains::{self, DomainPayload};
use crate::error::{EngineError, Result};
use crate::history::{BackupHistory, BackupHistoryRecord, BackupOrigin};
use crate::types::{BackupManifest, BackupResult, BackupStats, BackupType, FORMAT_VERSION};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Root manifest entry present only in full backups.
pub const MANIFEST_PATH: &str = "backup-info";

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub compress: bool,
    pub origin: BackupOrigin,
    /// Data-domain collection override; `None` backs up the default set.
    pub collections: Option<Vec<String>>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            compress: true,
            origin: BackupOrigin::Manual,
            collections: None,
        }
    }
}

/// Sortable archive filename: `{type}-backup-{timestamp}.tar.zst`.
pub(crate) fn archive_filename(backup_type: BackupType) -> String {
    format!(
        "{}-backup-{}.{}",
        backup_type,
        Utc::now().format("%Y-%m-%dT%H-%M-%S"),
        ARCHIVE_EXT
    )
}

pub struct BackupOrchestrator {
    client: Arc<dyn DataClient>,
    settings: Arc<dyn SettingsStore>,
    saver: Arc<dyn FileSaver>,
    history: BackupHistory,
}

impl BackupOrchestrator {
    pub fn new(
        client: Arc<dyn DataClient>,
        settings: Arc<dyn SettingsStore>,
        saver: Arc<dyn FileSaver>,
    ) -> Self {
        let history = BackupHistory::new(settings.clone());
        Self {
            client,
            settings,
            saver,
            history,
        }
    }

    pub fn history(&self) -> &BackupHistory {
        &self.history
    }

    /// Back up exactly one domain. `BackupType::Full` delegates to
    /// [`run_full`](Self::run_full).
    pub async fn run_selective(
        &self,
        backup_type: BackupType,
        options: &BackupOptions,
    ) -> BackupResult {
        if backup_type == BackupType::Full {
            return self.run_full(options).await;
        }
        let start = Instant::now();
        info!(backup_type = %backup_type, "Starting selective backup");
        let outcome = self.selective_archive(backup_type, options).await;
        self.finish(backup_type, options, start, outcome)
    }

    /// Back up all four domains into one archive with a root manifest.
    pub async fn run_full(&self, options: &BackupOptions) -> BackupResult {
        let start = Instant::now();
        info!("Starting full backup");
        let outcome = self.full_archive(options, start).await;
        self.finish(BackupType::Full, options, start, outcome)
    }

    async fn selective_archive(
        &self,
        backup_type: BackupType,
        options: &BackupOptions,
    ) -> Result<(String, u64)> {
        let payload = self.produce(backup_type, options).await?;
        self.pack_and_save(backup_type, payload.entries, options)
    }

    async fn full_archive(
        &self,
        options: &BackupOptions,
        start: Instant,
    ) -> Result<(String, u64)> {
        let generated_at = Utc::now();
        let mut entries: Vec<(String, String)> = Vec::new();
        let mut stats = BackupStats::default();

        for backup_type in [
            BackupType::Data,
            BackupType::Configuration,
            BackupType::Functions,
            BackupType::Security,
        ] {
            let payload = self.produce(backup_type, options).await?;
            stats.merge(&payload.stats);
            entries.extend(payload.entries);
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        let manifest = BackupManifest {
            backup_type: BackupType::Full,
            generated_at,
            entries: entries.iter().map(|(path, _)| path.clone()).collect(),
            stats,
            format_version: FORMAT_VERSION,
        };
        entries.push((MANIFEST_PATH.to_string(), serde_json::to_string_pretty(&manifest)?));

        self.pack_and_save(BackupType::Full, entries, options)
    }

    async fn produce(
        &self,
        backup_type: BackupType,
        options: &BackupOptions,
    ) -> Result<DomainPayload> {
        match backup_type {
            BackupType::Data => {
                let progress = |current: usize, total: usize, name: &str| {
                    let percent = if total == 0 { 100 } else { current * 100 / total };
                    info!(current, total, percent, collection = name, "Snapshotting collection");
                };
                domains::data::run(
                    self.client.as_ref(),
                    options.collections.as_deref(),
                    progress,
                )
                .await
            }
            BackupType::Configuration => domains::configuration::run(self.settings.as_ref()),
            BackupType::Security => domains::security::run(self.client.as_ref()).await,
            BackupType::Functions => domains::functions::run(),
            BackupType::Full => Err(EngineError::Archive(
                "full backups aggregate all domains; use run_full".to_string(),
            )),
        }
    }

    fn pack_and_save(
        &self,
        backup_type: BackupType,
        entries: Vec<(String, String)>,
        options: &BackupOptions,
    ) -> Result<(String, u64)> {
        let map = archive::into_entry_map(entries)?;
        let pack_options = PackOptions {
            compress: options.compress,
            ..Default::default()
        };
        let (blob, size) = archive::pack(&map, &pack_options)?;
        let filename = archive_filename(backup_type);
        archive::save(self.saver.as_ref(), &filename, &blob)?;
        Ok((filename, size))
    }

    fn finish(
        &self,
        backup_type: BackupType,
        options: &BackupOptions,
        start: Instant,
        outcome: Result<(String, u64)>,
    ) -> BackupResult {
        let duration_ms = start.elapsed().as_millis() as u64;
        let mut record = BackupHistoryRecord::new(options.origin);
        record.duration_ms = duration_ms;

        let result = match outcome {
            Ok((filename, size_bytes)) => {
                info!(
                    backup_type = %backup_type,
                    filename = %filename,
                    size_bytes,
                    duration_ms,
                    "Backup complete"
                );
                record.succeeded = true;
                record.filename = Some(filename.clone());
                record.size_bytes = Some(size_bytes);
                BackupResult {
                    success: true,
                    filename: Some(filename),
                    size_bytes: Some(size_bytes),
                    backup_type,
                    duration_ms,
                    error: None,
                }
            }
            Err(e) => {
                error!(backup_type = %backup_type, error = %e, duration_ms, "Backup failed");
                record.error = Some(e.to_string());
                BackupResult {
                    success: false,
                    filename: None,
                    size_bytes: None,
                    backup_type,
                    duration_ms,
                    error: Some(e.to_string()),
                }
            }
        };

        self.history.append(record);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_filenames_are_prefixed_and_sortable() {
        let name = archive_filename(BackupType::Security);
        assert!(name.starts_with("security-backup-"));
        assert!(name.ends_with(".tar.zst"));
        // Timestamp segment is fixed-width, so names sort chronologically.
        assert_eq!(name.len(), "security-backup-2026-01-01T00-00-00.tar.zst".len());
    }
}
