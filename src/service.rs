//! Light service
//!
//! Owns the in-memory preset table and ties the engine, the preset store and
//! the token controller to one settings backend and one token backend. This
//! is the surface the host glue (HUD, settings menu, CLI) talks to.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::preset::{LightPreset, PresetChanges, PresetTable};
use crate::config::settings::ModuleSettings;
use crate::config::store::same_serialized;
use crate::constants::events::CHANNEL_CAPACITY;
use crate::constants::notices::{LIGHT_RESET, PRESET_MISSING, RESET_DONE, SAVE_FAILED};
use crate::constants::preset::DEFAULT_PRESET_KEY;
use crate::engine::PresetEngine;
use crate::error::{LightError, LightResult};
use crate::host::{SettingsStore, TargetStore};
use crate::hud::{self, HudAction, HudControls};
use crate::panel::{ControlPanel, PanelOptions};
use crate::preview::{Clock, SystemClock};
use crate::token::{TargetId, ToggleOutcome, TokenLightController};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// Transient user-facing message; `message` is a localization key or text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warn, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresetEvent {
    /// The table was reset to the built-in defaults
    PresetsReset { light: PresetTable },
    Notice(Notice),
}

/// What a HUD click resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum HudResponse {
    Toggled(ToggleOutcome),
    OpenPanel(PanelOptions),
}

pub struct LightService<S, T> {
    settings: S,
    engine: PresetEngine,
    controller: TokenLightController<T>,
    models: Mutex<PresetTable>,
    events: broadcast::Sender<PresetEvent>,
}

impl<S: SettingsStore, T: TargetStore> LightService<S, T> {
    /// Service over the built-in presets; call [`LightService::start`] to
    /// pick up the persisted table
    pub fn new(settings: S, targets: T) -> Self {
        let engine = PresetEngine::default();
        let models = engine.reset_to_defaults(ModuleSettings::new(&settings).max_radius_limit());
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            settings,
            engine,
            controller: TokenLightController::new(targets),
            models: Mutex::new(models),
            events,
        }
    }

    /// Load, sanitize and normalize the persisted table, rewriting it only
    /// when that changed its serialized form. Returns whether it was rewritten.
    pub async fn start(&self) -> LightResult<bool> {
        let raw = self.engine.store().read_raw(&self.settings);
        let fixed = self.engine.load(raw.as_ref(), self.max_radius());
        let changed = !raw.as_ref().is_some_and(|raw| same_serialized(raw, &fixed));
        self.set_models(fixed.clone());

        if !changed {
            info!(presets = fixed.len(), "Loaded light presets");
            return Ok(false);
        }
        if let Err(e) = self.engine.store().save(&self.settings, &fixed).await {
            self.report(&e);
            return Err(e);
        }
        info!(presets = fixed.len(), "Stored light presets were repaired");
        self.notify(Notice::info(LIGHT_RESET));
        Ok(true)
    }

    fn lock_models(&self) -> MutexGuard<'_, PresetTable> {
        self.models.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_models(&self, table: PresetTable) {
        *self.lock_models() = table;
    }

    pub fn models(&self) -> PresetTable {
        self.lock_models().clone()
    }

    pub fn preset(&self, key: &str) -> Option<LightPreset> {
        self.lock_models().get(key).cloned()
    }

    /// Current cap, `None` when unlimited
    pub fn max_radius(&self) -> Option<f64> {
        self.settings().max_radius_limit()
    }

    pub fn settings(&self) -> ModuleSettings<'_, S> {
        ModuleSettings::new(&self.settings)
    }

    pub fn engine(&self) -> &PresetEngine {
        &self.engine
    }

    pub fn controller(&self) -> &TokenLightController<T> {
        &self.controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresetEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PresetEvent) {
        if self.events.send(event).is_err() {
            debug!("No listeners for preset event");
        }
    }

    fn notify(&self, notice: Notice) {
        self.emit(PresetEvent::Notice(notice));
    }

    /// Log a recovered failure and surface it as a notice
    pub(crate) fn report(&self, e: &LightError) {
        let notice = match e {
            LightError::PresetNotFound { key } => {
                warn!(preset = %key, "Preset not found");
                Notice::error(PRESET_MISSING)
            }
            LightError::TargetNotFound { target } => {
                warn!(target = %target, "Token not found");
                Notice::warn(e.to_string())
            }
            LightError::InvalidField { field, reason } => {
                warn!(field, reason = %reason, "Invalid field");
                Notice::warn(e.to_string())
            }
            LightError::Persistence(reason) => {
                error!(reason = %reason, "Persistence failed");
                Notice::error(SAVE_FAILED)
            }
        };
        self.notify(notice);
    }

    fn reported<V>(&self, result: LightResult<V>) -> LightResult<V> {
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// Persist a new cap, then re-normalize and persist the table against it
    pub async fn set_max_radius(&self, value: f64) -> LightResult<f64> {
        let stored = self.reported(self.settings().set_max_radius(value).await)?;
        let table = PresetEngine::normalize_table(&self.models(), self.max_radius());
        self.reported(self.engine.store().save(&self.settings, &table).await)?;
        self.set_models(table);
        Ok(stored)
    }

    pub async fn apply_light(&self, target: &TargetId, key: &str) -> LightResult<ToggleOutcome> {
        let models = self.models();
        let result = self.controller.apply_preset(target, key, &models, self.max_radius()).await;
        self.reported(result)
    }

    pub async fn reset_light(&self, target: &TargetId) -> LightResult<ToggleOutcome> {
        let result = self.controller.reset_light(target).await;
        self.reported(result)
    }

    fn reported_toggle(&self, outcome: ToggleOutcome) -> ToggleOutcome {
        if let ToggleOutcome::Failed(e) = &outcome {
            self.report(e);
        }
        outcome
    }

    /// HUD "on" click: the token's chosen preset, else the default preset
    pub async fn light_on(&self, target: &TargetId) -> ToggleOutcome {
        let models = self.models();
        let outcome = self.controller.toggle_on(target, DEFAULT_PRESET_KEY, &models, self.max_radius()).await;
        self.reported_toggle(outcome)
    }

    pub async fn light_off(&self, target: &TargetId) -> ToggleOutcome {
        let outcome = self.controller.toggle_off(target).await;
        self.reported_toggle(outcome)
    }

    /// Replace the table with the built-in defaults and announce it
    pub async fn reset_presets(&self) -> LightResult<PresetTable> {
        let table = self.engine.reset_to_defaults(self.max_radius());
        self.reported(self.engine.store().save(&self.settings, &table).await)?;
        self.set_models(table.clone());
        info!(presets = table.len(), "Reset light presets to defaults");
        self.emit(PresetEvent::PresetsReset { light: table.clone() });
        self.notify(Notice::info(RESET_DONE));
        Ok(table)
    }

    /// Merge `changes` onto `key`, persist, and return the stored preset.
    /// The in-memory table only moves once the save succeeded.
    pub async fn update_preset(&self, key: &str, changes: &PresetChanges) -> LightResult<LightPreset> {
        let next = self.reported(self.engine.update_preset(&self.models(), key, changes, self.max_radius()))?;
        self.reported(self.engine.store().save(&self.settings, &next).await)?;
        let saved = next.get(key).cloned().ok_or_else(|| LightError::preset_not_found(key))?;
        self.set_models(next);
        Ok(saved)
    }

    pub fn open_control_panel(&self, options: PanelOptions) -> ControlPanel<'_, S, T, SystemClock> {
        self.open_control_panel_with_clock(options, SystemClock)
    }

    pub fn open_control_panel_with_clock<C: Clock>(&self, options: PanelOptions, clock: C) -> ControlPanel<'_, S, T, C> {
        ControlPanel::new(self, options, clock)
    }

    pub fn hud_controls(&self, target: &TargetId, is_gm: bool) -> Option<HudControls> {
        let settings = self.settings();
        hud::hud_controls(settings.token_button(), is_gm, settings.light_icon(), self.controller.state(target))
    }

    pub fn panel_options_for_token(&self, target: &TargetId) -> PanelOptions {
        hud::panel_options_for(target, self.controller.chosen_model(target).as_deref())
    }

    pub async fn hud_action(&self, target: &TargetId, action: HudAction) -> HudResponse {
        match action {
            HudAction::On => HudResponse::Toggled(self.light_on(target).await),
            HudAction::Off => HudResponse::Toggled(self.light_off(target).await),
            HudAction::OpenPanel => HudResponse::OpenPanel(self.panel_options_for_token(target)),
        }
    }
}
