//! Backup validator: detects an archive's backup type from its entry names
//! and confirms structural completeness. Never mutates the archive.

use crate::archive;
use crate::domains::{configuration, data, functions, security};
use crate::orchestrator::MANIFEST_PATH;
use crate::types::BackupType;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub detected_type: Option<BackupType>,
    pub errors: Vec<String>,
}

/// Marker entries checked in fixed priority order.
const MARKERS: &[(&str, BackupType)] = &[
    (MANIFEST_PATH, BackupType::Full),
    (data::METADATA_PATH, BackupType::Data),
    (configuration::SETTINGS_PATH, BackupType::Configuration),
    (functions::METADATA_PATH, BackupType::Functions),
    (security::METADATA_PATH, BackupType::Security),
];

/// Entries a full backup must carry beyond the root manifest.
const FULL_REQUIRED: &[&str] = &[
    data::METADATA_PATH,
    configuration::SETTINGS_PATH,
    functions::METADATA_PATH,
    security::METADATA_PATH,
];

/// Inspect a candidate archive. Errors are reported as a list of distinct
/// strings so a caller can display all problems at once; a detected type is
/// still reported when it disagrees with `expected`.
pub fn validate(blob: &[u8], expected: Option<BackupType>) -> ValidationReport {
    let listing = match archive::list_entries(blob) {
        Ok(listing) => listing,
        Err(e) => {
            return ValidationReport {
                valid: false,
                detected_type: None,
                errors: vec![e.to_string()],
            };
        }
    };
    let names: BTreeSet<&str> = listing.iter().map(|(path, _)| path.as_str()).collect();

    let mut errors = Vec::new();
    let detected_type = MARKERS
        .iter()
        .find(|(marker, _)| names.contains(marker))
        .map(|(_, backup_type)| *backup_type);

    match detected_type {
        None => {
            errors.push("no recognized backup marker entry found".to_string());
        }
        Some(BackupType::Full) => {
            for required in FULL_REQUIRED {
                if !names.contains(required) {
                    errors.push(format!("full backup is missing required entry '{required}'"));
                }
            }
        }
        Some(_) => {}
    }

    if let (Some(expected), Some(detected)) = (expected, detected_type) {
        if expected != detected {
            errors.push(format!(
                "expected a {expected} backup but archive looks like {detected}"
            ));
        }
    }
    ValidationReport {
        valid: errors.is_empty(),
        detected_type,
        errors,
    }
}
