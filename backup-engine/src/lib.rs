//! Backup & restore engine for the asset management console.
//!
//! Snapshots relational collections and system configuration into a portable
//! compressed archive, validates and restores those archives, and enforces
//! retention policy over accumulated backup history. The relational data
//! client, settings store, and host file-save primitive are injected at
//! construction; the engine itself is single-flow per invocation and holds no
//! locks, so callers serialize concurrent backup/restore runs themselves.

pub mod archive;
pub mod client;
pub mod domains;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod restore;
pub mod retention;
pub mod snapshot;
pub mod tabular;
pub mod types;
pub mod validator;

pub use client::{DataClient, DirectorySaver, FileSaver, MemorySettings, SettingsStore};
pub use error::{EngineError, Result};
pub use history::{BackupHistory, BackupHistoryRecord, BackupOrigin};
pub use orchestrator::{BackupOptions, BackupOrchestrator};
pub use restore::RestorePipeline;
pub use retention::{RetentionManager, RetentionPolicy, RetentionReport};
pub use snapshot::{CollectionSnapshot, SnapshotCollector};
pub use types::{
    display_name, BackupManifest, BackupResult, BackupStats, BackupType, PreviewStatus, Record,
    RestorePreviewItem, RestoreResult, FORMAT_VERSION,
};
pub use validator::{validate, ValidationReport};
