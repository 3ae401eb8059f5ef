//! Domain backup modules: four independent payload producers.
//!
//! Each module yields a self-describing `DomainPayload` whose entries are
//! already addressed under the module's domain prefix, so the orchestrator can
//! pack one of them (selective backup) or all of them (full backup) without
//! knowing their internals.

pub mod configuration;
pub mod data;
pub mod functions;
pub mod security;

use crate::types::BackupStats;

/// Entries contributed by one domain module plus its counters.
#[derive(Debug, Clone)]
pub struct DomainPayload {
    /// `(logical path, content)` pairs, unique within the payload.
    pub entries: Vec<(String, String)>,
    pub stats: BackupStats,
}
