//! Preset store: load with sanitation, save, and serialized-form equality

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::preset::{LightPreset, PresetTable, default_presets};
use crate::config::schema::{PRESET_SCHEMA, Sanitized, sanitize_record};
use crate::constants::{MODULE_ID, settings::LIGHT_MODELS};
use crate::error::LightResult;
use crate::host::SettingsStore;

/// Canonical serialized form (object keys sorted) used for equality checks
pub fn serialized_form<T: Serialize>(value: &T) -> Option<String> {
    let value = serde_json::to_value(value).ok()?;
    serde_json::to_string(&value).ok()
}

/// Two values are equal iff their serialized forms are byte-identical
pub fn same_serialized<A: Serialize, B: Serialize>(a: &A, b: &B) -> bool {
    match (serialized_form(a), serialized_form(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct PresetStore {
    defaults: PresetTable,
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::new(default_presets())
    }
}

impl PresetStore {
    pub fn new(defaults: PresetTable) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &PresetTable {
        &self.defaults
    }

    /// Sanitize a raw persisted table against the defaults.
    ///
    /// Only keys present in the defaults survive. Each record is either merged
    /// onto its default or, on shape drift, replaced by a fresh default.
    pub fn load_or_default(&self, raw: Option<&Value>) -> PresetTable {
        let raw = raw.and_then(Value::as_object);
        let mut table = PresetTable::new();
        for (key, default) in &self.defaults {
            let default_value = match serde_json::to_value(default) {
                Ok(value) => value,
                Err(e) => {
                    warn!(preset = %key, error = %e, "Failed to serialize default preset");
                    table.insert(key.clone(), default.clone());
                    continue;
                }
            };
            let candidate = raw.and_then(|map| map.get(key));
            let preset = match sanitize_record(PRESET_SCHEMA, &default_value, candidate) {
                Sanitized::Merged(value) => serde_json::from_value::<LightPreset>(value)
                    .unwrap_or_else(|e| {
                        warn!(preset = %key, error = %e, "Merged preset did not decode, using default");
                        default.clone()
                    }),
                Sanitized::Fallback { reason, .. } => {
                    if candidate.is_some() {
                        warn!(preset = %key, reason = %reason, "Stored preset drifted from schema, using default");
                    }
                    default.clone()
                }
            };
            table.insert(key.clone(), preset);
        }
        table
    }

    /// Raw persisted table, if any
    pub fn read_raw<S: SettingsStore>(&self, settings: &S) -> Option<Value> {
        settings.get(MODULE_ID, LIGHT_MODELS)
    }

    /// Persist the whole table; callers pass an already-normalized table
    pub async fn save<S: SettingsStore>(&self, settings: &S, table: &PresetTable) -> LightResult<()> {
        let value = serde_json::to_value(table)?;
        settings.set(MODULE_ID, LIGHT_MODELS, value).await?;
        info!(presets = table.len(), "Saved light presets");
        Ok(())
    }
}
