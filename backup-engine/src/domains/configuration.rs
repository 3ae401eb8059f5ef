//! Configuration domain: environment identity, feature flags, and free-form
//! application settings. Read-only over the injected settings store; no
//! external query.

use super::DomainPayload;
use crate::client::SettingsStore;
use crate::error::Result;
use crate::types::BackupStats;
use chrono::Utc;
use serde_json::{json, Value};

/// Marker entry for configuration backups.
pub const SETTINGS_PATH: &str = "configuration/settings";

/// Feature flags known to the console.
pub const FEATURE_FLAGS: &[&str] = &[
    "scheduled_backups",
    "maintenance_mode",
    "asset_auditing",
    "email_alerts",
];

const ENVIRONMENT_KEY: &str = "app.environment";
const FLAG_PREFIX: &str = "feature.";
/// Engine-internal keys (backup history) never exported as application settings.
const INTERNAL_PREFIX: &str = "backup.";

pub fn run(settings: &dyn SettingsStore) -> Result<DomainPayload> {
    let environment = settings
        .get(ENVIRONMENT_KEY)
        .unwrap_or_else(|| "production".to_string());

    let mut flags = serde_json::Map::new();
    for flag in FEATURE_FLAGS {
        let enabled = settings
            .get(&format!("{FLAG_PREFIX}{flag}"))
            .map(|v| v == "true")
            .unwrap_or(false);
        flags.insert(flag.to_string(), Value::Bool(enabled));
    }

    let mut app_settings = serde_json::Map::new();
    for (key, value) in settings.entries() {
        if key.starts_with(FLAG_PREFIX) || key.starts_with(INTERNAL_PREFIX) {
            continue;
        }
        app_settings.insert(key, Value::String(value));
    }

    let document = json!({
        "environment": environment,
        "exported_at": Utc::now().to_rfc3339(),
        "feature_flags": flags,
        "settings": app_settings,
    });

    Ok(DomainPayload {
        entries: vec![(SETTINGS_PATH.to_string(), serde_json::to_string_pretty(&document)?)],
        stats: BackupStats::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemorySettings;

    #[test]
    fn exports_flags_and_settings_but_not_internal_keys() {
        let store = MemorySettings::new();
        store.set("app.environment", "staging");
        store.set("feature.maintenance_mode", "true");
        store.set("ui.theme", "dark");
        store.set("backup.history", "[]");

        let payload = run(&store).unwrap();
        assert_eq!(payload.entries.len(), 1);
        let (path, content) = &payload.entries[0];
        assert_eq!(path, SETTINGS_PATH);

        let doc: Value = serde_json::from_str(content).unwrap();
        assert_eq!(doc["environment"], "staging");
        assert_eq!(doc["feature_flags"]["maintenance_mode"], true);
        assert_eq!(doc["feature_flags"]["email_alerts"], false);
        assert_eq!(doc["settings"]["ui.theme"], "dark");
        assert!(doc["settings"].get("backup.history").is_none());
        assert!(doc["settings"].get("feature.maintenance_mode").is_none());
    }
}
