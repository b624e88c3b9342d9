//! Typed access to the module's world settings

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::constants::MODULE_ID;
use crate::constants::settings::{DEFAULT_MAX_LIGHT_RADIUS, LIGHT_ICON, MAX_LIGHT_RADIUS, TOKEN_BUTTON};
use crate::error::LightResult;
use crate::host::SettingsStore;
use crate::radius::{coerce_number, normalize_max_radius_limit, normalize_max_radius_setting_value};

/// Icon pair shown on the token HUD
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightIcon {
    #[default]
    Feu,
    Lampe,
}

impl LightIcon {
    pub fn as_str(self) -> &'static str {
        match self {
            LightIcon::Feu => "feu",
            LightIcon::Lampe => "lampe",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "feu" => Some(LightIcon::Feu),
            "lampe" => Some(LightIcon::Lampe),
            _ => None,
        }
    }
}

/// Borrowed view over the settings backend
pub struct ModuleSettings<'a, S> {
    store: &'a S,
}

impl<'a, S: SettingsStore> ModuleSettings<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.store.get(MODULE_ID, key)
    }

    pub fn token_button(&self) -> bool {
        self.get(TOKEN_BUTTON).and_then(|v| v.as_bool()).unwrap_or(true)
    }

    pub fn light_icon(&self) -> LightIcon {
        self.get(LIGHT_ICON)
            .and_then(|v| v.as_str().and_then(LightIcon::parse))
            .unwrap_or_default()
    }

    /// Stored max radius (normalized), default when never set
    pub fn max_radius_setting(&self) -> f64 {
        match self.get(MAX_LIGHT_RADIUS) {
            Some(value) => normalize_max_radius_setting_value(coerce_number(&value).unwrap_or(f64::NAN)),
            None => DEFAULT_MAX_LIGHT_RADIUS,
        }
    }

    /// Cap for clamp operations; `None` is unlimited
    pub fn max_radius_limit(&self) -> Option<f64> {
        normalize_max_radius_limit(self.max_radius_setting())
    }

    pub async fn set_token_button(&self, enabled: bool) -> LightResult<()> {
        self.store.set(MODULE_ID, TOKEN_BUTTON, Value::Bool(enabled)).await
    }

    pub async fn set_light_icon(&self, icon: LightIcon) -> LightResult<()> {
        self.store.set(MODULE_ID, LIGHT_ICON, Value::from(icon.as_str())).await
    }

    /// Normalize and persist the max radius, returning the stored value
    pub async fn set_max_radius(&self, value: f64) -> LightResult<f64> {
        let normalized = normalize_max_radius_setting_value(value);
        self.store.set(MODULE_ID, MAX_LIGHT_RADIUS, Value::from(normalized)).await?;
        info!(max_radius = normalized, "Updated max light radius");
        Ok(normalized)
    }
}
