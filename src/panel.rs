//! Preset control panel
//!
//! Backs the host's configuration window: which presets exist, which one is
//! selected, the raw form values for it, saving a submitted form and live
//! previewing unsaved edits on the selected tokens.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::config::preset::{AnimationChanges, LightPreset, PresetChanges, is_hex_color};
use crate::constants::preset::{
    DEFAULT_ANGLE, DEFAULT_INTENSITY, DEFAULT_PRESET_KEY, FALLBACK_COLOR, MAX_ANGLE, NO_ANIMATION,
};
use crate::error::{LightError, LightResult};
use crate::host::{SettingsStore, TargetStore};
use crate::preview::{Clock, PassOutcome, PreviewCoordinator, PreviewRequest, SystemClock};
use crate::service::LightService;
use crate::token::TargetId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelOptions {
    pub selected_light_key: Option<String>,
    pub token_id: Option<TargetId>,
    #[serde(default)]
    pub apply_on_save: bool,
}

/// Raw form values as the window holds them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelForm {
    pub light_key: String,
    pub color: String,
    pub intensity: String,
    pub dim: String,
    pub bright: String,
    pub angle: String,
    pub animation: String,
}

impl PanelForm {
    /// Form pre-filled from `model`, or display defaults when there is none
    pub fn for_model(key: &str, model: Option<&LightPreset>) -> Self {
        let animation = model
            .and_then(|m| m.animation.kind.clone())
            .unwrap_or_else(|| NO_ANIMATION.to_string());
        Self {
            light_key: key.to_string(),
            color: model.map_or_else(|| FALLBACK_COLOR.to_string(), |m| m.color.clone()),
            intensity: model.map_or(DEFAULT_INTENSITY, |m| m.intensity).to_string(),
            dim: model.map_or(0.0, |m| m.dim).to_string(),
            bright: model.map_or(0.0, |m| m.bright).to_string(),
            angle: model.map_or(DEFAULT_ANGLE, |m| m.angle).to_string(),
            animation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelContext {
    pub models: Vec<(String, LightPreset)>,
    pub selected_light_key: String,
    pub selected: PanelForm,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(LightPreset),
    /// Another save was still in flight
    Ignored,
}

fn invalid(field: &'static str, raw: &str) {
    let e = LightError::InvalidField { field, reason: format!("unparseable value {raw:?}") };
    warn!(error = %e, "Falling back for form field");
}

fn parse_number(field: &'static str, raw: &str) -> Option<f64> {
    let parsed = raw.trim().parse::<f64>().ok().filter(|n| n.is_finite());
    if parsed.is_none() {
        invalid(field, raw);
    }
    parsed
}

/// Turn submitted form values into changes for `model`.
///
/// Radii and angle are whole numbers (fractions are truncated), intensity is
/// kept within `[0, 1]`. A malformed value keeps the model's value, except a
/// malformed color which becomes the fallback color.
pub fn parse_form(form: &PanelForm, model: &LightPreset) -> PresetChanges {
    let color = if is_hex_color(form.color.trim()) {
        form.color.trim().to_string()
    } else {
        invalid("color", &form.color);
        FALLBACK_COLOR.to_string()
    };
    let intensity = parse_number("intensity", &form.intensity).map_or(model.intensity, |n| n.clamp(0.0, 1.0));
    let dim = parse_number("dim", &form.dim).map_or(model.dim, f64::trunc);
    let bright = parse_number("bright", &form.bright).map_or(model.bright, f64::trunc);
    let angle = parse_number("angle", &form.angle).map_or(model.angle, |n| n.trunc().clamp(0.0, MAX_ANGLE));

    let kind = match form.animation.trim() {
        "" | NO_ANIMATION => None,
        kind => Some(kind.to_string()),
    };

    PresetChanges {
        color: Some(color),
        intensity: Some(intensity),
        dim: Some(dim),
        bright: Some(bright),
        angle: Some(angle),
        animation: Some(AnimationChanges {
            kind: Some(kind),
            speed: Some(model.animation.speed),
            intensity: Some(model.animation.intensity),
        }),
        ..Default::default()
    }
}

/// Clears the in-flight flag when a save ends
struct SaveGuard<'a>(&'a AtomicBool);

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ControlPanel<'a, S, T, C = SystemClock> {
    service: &'a LightService<S, T>,
    options: PanelOptions,
    preview: PreviewCoordinator<C>,
    saving: AtomicBool,
}

impl<'a, S: SettingsStore, T: TargetStore, C: Clock> ControlPanel<'a, S, T, C> {
    pub fn new(service: &'a LightService<S, T>, options: PanelOptions, clock: C) -> Self {
        Self {
            service,
            options,
            preview: PreviewCoordinator::new(clock),
            saving: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &PanelOptions {
        &self.options
    }

    pub fn preview(&self) -> &PreviewCoordinator<C> {
        &self.preview
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    /// Presets plus the selection: the requested key, else the first preset
    pub fn context(&self) -> PanelContext {
        let models: Vec<(String, LightPreset)> = self.service.models().into_iter().collect();
        let selected_light_key = self
            .options
            .selected_light_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRESET_KEY.to_string());
        let model = models
            .iter()
            .find(|(key, _)| *key == selected_light_key)
            .or_else(|| models.first())
            .map(|(_, model)| model);
        let selected = PanelForm::for_model(&selected_light_key, model);
        PanelContext { models, selected_light_key, selected }
    }

    /// Form values after switching the selection to `key`
    pub fn form_for(&self, key: &str) -> Option<PanelForm> {
        self.service.preset(key).map(|model| PanelForm::for_model(key, Some(&model)))
    }

    /// Save the submitted form. A submit while another is in flight is ignored.
    pub async fn submit(&self, form: &PanelForm) -> LightResult<SaveOutcome> {
        if self.saving.swap(true, Ordering::AcqRel) {
            info!(preset = %form.light_key, "Save already in flight, ignoring submit");
            return Ok(SaveOutcome::Ignored);
        }
        let _saving = SaveGuard(&self.saving);

        let key = form.light_key.trim();
        let Some(model) = self.service.preset(key) else {
            let e = LightError::preset_not_found(key);
            self.service.report(&e);
            return Err(e);
        };
        let saved = self.service.update_preset(key, &parse_form(form, &model)).await?;
        info!(preset = %key, "Saved preset from control panel");

        if self.options.apply_on_save {
            if let Some(token) = &self.options.token_id {
                if let Err(e) = self.service.apply_light(token, key).await {
                    warn!(target = %token, preset = %key, error = %e, "Saved preset but could not apply it");
                }
            }
        }
        // tokens now carry the saved values, not the last preview
        self.preview.invalidate();
        Ok(SaveOutcome::Saved(saved))
    }

    /// Schedule a live preview of unsaved `form` values on `targets`
    pub fn preview_edit(&self, form: &PanelForm, targets: Vec<TargetId>) -> LightResult<()> {
        let key = form.light_key.trim();
        let Some(model) = self.service.preset(key) else {
            let e = LightError::preset_not_found(key);
            self.service.report(&e);
            return Err(e);
        };
        let draft = model.with_changes(&parse_form(form, &model));
        self.preview.request(PreviewRequest {
            preset_key: key.to_string(),
            targets,
            max_radius: self.service.max_radius(),
            draft,
        });
        Ok(())
    }

    pub async fn poll_preview(&self) -> Vec<PassOutcome> {
        self.preview.poll(self.service.controller()).await
    }
}
