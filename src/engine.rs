//! Preset engine
//!
//! Composes the preset store with the radius policy. Every operation here is
//! synchronous and pure given its inputs; persistence and announcements are
//! left to the caller (see [`crate::service::LightService`]).

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::preset::{LightPreset, PresetChanges, PresetTable};
use crate::config::schema::{PRESET_SCHEMA, merge};
use crate::config::store::PresetStore;
use crate::error::{LightError, LightResult};
use crate::radius::normalize_radii;

#[derive(Debug, Clone, Default)]
pub struct PresetEngine {
    store: PresetStore,
}

impl PresetEngine {
    pub fn new(store: PresetStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &PresetStore {
        &self.store
    }

    /// Clamp dim/bright against the cap; other fields are untouched
    pub fn normalize_preset(preset: &LightPreset, max_radius: Option<f64>) -> LightPreset {
        let radii = normalize_radii(preset.dim, preset.bright, max_radius);
        LightPreset {
            dim: radii.dim,
            bright: radii.bright,
            ..preset.clone()
        }
    }

    pub fn normalize_table(table: &PresetTable, max_radius: Option<f64>) -> PresetTable {
        table
            .iter()
            .map(|(key, preset)| (key.clone(), Self::normalize_preset(preset, max_radius)))
            .collect()
    }

    /// Sanitize raw persisted data and normalize it against the cap
    pub fn load(&self, raw: Option<&Value>, max_radius: Option<f64>) -> PresetTable {
        Self::normalize_table(&self.store.load_or_default(raw), max_radius)
    }

    /// Fresh normalized copy of the built-in defaults
    pub fn reset_to_defaults(&self, max_radius: Option<f64>) -> PresetTable {
        Self::normalize_table(self.store.defaults(), max_radius)
    }

    /// Coerce every field of `candidate` to its schema kind. Out-of-range
    /// numbers are clamped, values that cannot be coerced keep `current`'s.
    pub fn conform_preset(current: &LightPreset, candidate: &LightPreset) -> LightResult<LightPreset> {
        let fallback = serde_json::to_value(current)?;
        let raw = serde_json::to_value(candidate)?;
        let (Some(fallback), Some(raw)) = (fallback.as_object(), raw.as_object()) else {
            return Err(LightError::persistence("preset did not serialize to an object"));
        };
        let conformed: LightPreset = serde_json::from_value(Value::Object(merge(PRESET_SCHEMA, fallback, raw)))?;
        if conformed != *candidate {
            warn!(preset = %candidate.name, "Coerced preset fields out of their allowed range");
        }
        Ok(conformed)
    }

    /// Merge `changes` onto `key` and return the re-normalized table
    pub fn update_preset(
        &self,
        table: &PresetTable,
        key: &str,
        changes: &PresetChanges,
        max_radius: Option<f64>,
    ) -> LightResult<PresetTable> {
        let current = table.get(key).ok_or_else(|| LightError::preset_not_found(key))?;
        let conformed = Self::conform_preset(current, &current.with_changes(changes))?;
        let updated = Self::normalize_preset(&conformed, max_radius);
        debug!(preset = %key, dim = updated.dim, bright = updated.bright, "Updated preset");

        let mut next = table.clone();
        next.insert(key.to_string(), updated);
        // the cap may have moved since the table was last normalized
        Ok(Self::normalize_table(&next, max_radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::preset::{AnimationChanges, default_presets};
    use crate::config::store::same_serialized;

    fn skewed_table() -> PresetTable {
        let mut table = default_presets();
        let lamp = table.get_mut("lamp").unwrap();
        lamp.dim = 3.0;
        lamp.bright = 40.0;
        table.get_mut("sunlight").unwrap().dim = -8.0;
        table
    }

    #[test]
    fn test_normalize_table_is_idempotent() {
        for cap in [None, Some(0.0), Some(5.0), Some(10.0), Some(25.5), Some(1000.0)] {
            let once = PresetEngine::normalize_table(&skewed_table(), cap);
            let twice = PresetEngine::normalize_table(&once, cap);
            assert_eq!(once, twice, "cap {cap:?}");
            for preset in once.values() {
                assert!(preset.dim >= preset.bright && preset.bright >= 0.0);
                if let Some(m) = cap.filter(|m| *m > 0.0) {
                    assert!(preset.dim <= m && preset.bright <= m);
                }
            }
        }
    }

    #[test]
    fn test_defaults_under_cap_of_ten() {
        let table = PresetEngine::normalize_table(&default_presets(), Some(10.0));
        let torch = &table["torchLight"];
        assert_eq!((torch.dim, torch.bright), (10.0, 6.0));
        // non-radius fields are untouched
        assert_eq!(torch.color, default_presets()["torchLight"].color);
    }

    #[test]
    fn test_update_preset_reconciles_bright_above_cap() {
        let engine = PresetEngine::default();
        let table = engine.reset_to_defaults(Some(10.0));
        let changes = PresetChanges {
            dim: Some(12.0),
            bright: Some(15.0),
            ..Default::default()
        };
        let next = engine.update_preset(&table, "torchLight", &changes, Some(10.0)).unwrap();
        assert_eq!((next["torchLight"].dim, next["torchLight"].bright), (10.0, 10.0));
        // input table is not mutated
        assert_eq!(table["torchLight"].bright, 6.0);
    }

    #[test]
    fn test_update_preset_renormalizes_whole_table_for_new_cap() {
        let engine = PresetEngine::default();
        let table = engine.reset_to_defaults(None);
        let next = engine
            .update_preset(&table, "lamp", &PresetChanges::default(), Some(8.0))
            .unwrap();
        assert!(next.values().all(|p| p.dim <= 8.0));
    }

    #[test]
    fn test_update_preset_coerces_invalid_fields() {
        let engine = PresetEngine::default();
        let table = engine.reset_to_defaults(None);
        let changes = PresetChanges {
            color: Some("orange".into()),
            angle: Some(720.0),
            alpha: Some(3.0),
            intensity: Some(-2.0),
            animation: Some(AnimationChanges { speed: Some(200), ..Default::default() }),
            ..Default::default()
        };
        let next = engine.update_preset(&table, "lamp", &changes, None).unwrap();
        let lamp = &next["lamp"];
        assert_eq!(lamp.color, table["lamp"].color);
        assert_eq!(lamp.angle, 360.0);
        assert_eq!(lamp.alpha, 1.0);
        assert_eq!(lamp.intensity, 0.0);
        assert_eq!(lamp.animation.speed, 10);
        assert_eq!(lamp.animation.intensity, table["lamp"].animation.intensity);
    }

    #[test]
    fn test_update_preset_non_finite_radius_keeps_previous() {
        let engine = PresetEngine::default();
        let table = engine.reset_to_defaults(None);
        let changes = PresetChanges { dim: Some(f64::NAN), ..Default::default() };
        let next = engine.update_preset(&table, "lamp", &changes, None).unwrap();
        assert_eq!(next["lamp"].dim, table["lamp"].dim);
    }

    #[test]
    fn test_conform_preset_keeps_valid_candidate() {
        let lamp = default_presets()["lamp"].clone();
        let candidate = LightPreset { color: "#123".into(), angle: 90.0, ..lamp.clone() };
        assert_eq!(PresetEngine::conform_preset(&lamp, &candidate).unwrap(), candidate);
    }

    #[test]
    fn test_update_unknown_preset_is_not_found() {
        let engine = PresetEngine::default();
        let result = engine.update_preset(&default_presets(), "candle", &PresetChanges::default(), None);
        assert_eq!(result, Err(LightError::preset_not_found("candle")));
    }

    #[test]
    fn test_load_sanitizes_then_normalizes() {
        let engine = PresetEngine::default();
        let mut raw = serde_json::to_value(default_presets()).unwrap();
        raw["lamp"]["bright"] = serde_json::json!(50);
        let table = engine.load(Some(&raw), Some(20.0));
        assert_eq!((table["lamp"].dim, table["lamp"].bright), (20.0, 20.0));
        assert!(!same_serialized(&raw, &table));
    }
}
