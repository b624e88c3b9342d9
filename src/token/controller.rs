//! Token light controller
//!
//! Per-token state machine `off ⇄ on`. Applying a preset first takes a
//! one-time backup of the token's light (`base_light`), turning the light off
//! restores that backup. Toggles on the same token are mutually exclusive: a
//! request that arrives while another is in flight is dropped, not queued.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, warn};

use super::light::{LightState, LightUpdate, TargetId};
use crate::config::preset::PresetTable;
use crate::constants::MODULE_ID;
use crate::constants::flags::{BASE_LIGHT, CHOSEN_MODEL, LIGHT_ICON_STATE};
use crate::engine::PresetEngine;
use crate::error::{LightError, LightResult};
use crate::host::TargetStore;

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// The request ran to completion
    Done,
    /// Another request for the same token was in flight; this one was dropped
    Busy,
    /// The HUD toggle ran and failed; the error was logged and is handed back
    /// so the caller can surface it
    Failed(LightError),
}

/// Set of token ids with a claim held by an in-flight operation
#[derive(Default)]
struct ClaimSet(Mutex<HashSet<TargetId>>);

impl ClaimSet {
    /// `None` when the token is already claimed
    fn claim(&self, target: &TargetId) -> Option<Claim<'_>> {
        let mut set = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        set.insert(target.clone()).then(|| Claim { set: self, target: target.clone() })
    }

    fn contains(&self, target: &TargetId) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).contains(target)
    }
}

/// Released on drop, whatever path the operation exits through
struct Claim<'a> {
    set: &'a ClaimSet,
    target: TargetId,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.set.0.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.target);
    }
}

pub struct TokenLightController<T> {
    targets: T,
    busy: ClaimSet,
    pending_backups: ClaimSet,
}

impl<T: TargetStore> TokenLightController<T> {
    pub fn new(targets: T) -> Self {
        Self {
            targets,
            busy: ClaimSet::default(),
            pending_backups: ClaimSet::default(),
        }
    }

    pub fn targets(&self) -> &T {
        &self.targets
    }

    pub fn is_busy(&self, target: &TargetId) -> bool {
        self.busy.contains(target)
    }

    pub fn state(&self, target: &TargetId) -> LightState {
        LightState::from_flag(self.targets.flag(target, MODULE_ID, LIGHT_ICON_STATE).as_ref())
    }

    pub fn chosen_model(&self, target: &TargetId) -> Option<String> {
        self.targets
            .flag(target, MODULE_ID, CHOSEN_MODEL)
            .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
            .filter(|key| !key.is_empty())
    }

    pub fn backup(&self, target: &TargetId) -> Option<LightUpdate> {
        self.targets
            .flag(target, MODULE_ID, BASE_LIGHT)
            .filter(|v| !v.is_null())
            .and_then(|v| match serde_json::from_value(v) {
                Ok(update) => Some(update),
                Err(e) => {
                    warn!(target = %target, error = %e, "Ignoring unreadable light backup");
                    None
                }
            })
    }

    fn ensure_exists(&self, target: &TargetId) -> LightResult<()> {
        match self.targets.light(target) {
            Some(_) => Ok(()),
            None => Err(LightError::TargetNotFound { target: target.clone() }),
        }
    }

    /// Snapshot the token's light into `base_light` if it is off and has no
    /// backup yet. Returns whether a backup was written.
    pub async fn ensure_backup(&self, target: &TargetId) -> LightResult<bool> {
        let Some(_pending) = self.pending_backups.claim(target) else {
            debug!(target = %target, "Backup already in flight");
            return Ok(false);
        };
        if self.state(target) != LightState::Off {
            return Ok(false);
        }
        if self.targets.flag(target, MODULE_ID, BASE_LIGHT).is_some_and(|v| !v.is_null()) {
            return Ok(false);
        }
        let light = self
            .targets
            .light(target)
            .ok_or_else(|| LightError::TargetNotFound { target: target.clone() })?;
        let snapshot = serde_json::to_value(LightUpdate::snapshot(&light))?;
        self.targets.set_flag(target, MODULE_ID, BASE_LIGHT, snapshot).await?;
        info!(target = %target, "Backed up token light");
        Ok(true)
    }

    /// Drop the backup so the next activation snapshots the current light
    pub async fn forget_backup(&self, target: &TargetId) -> LightResult<()> {
        self.targets.unset_flag(target, MODULE_ID, BASE_LIGHT).await
    }

    /// Apply preset `key` from `table` to the token
    pub async fn apply_preset(
        &self,
        target: &TargetId,
        key: &str,
        table: &PresetTable,
        max_radius: Option<f64>,
    ) -> LightResult<ToggleOutcome> {
        let Some(_claim) = self.busy.claim(target) else {
            debug!(target = %target, preset = %key, "Token busy, dropping apply");
            return Ok(ToggleOutcome::Busy);
        };
        self.apply_claimed(target, key, table, max_radius).await?;
        Ok(ToggleOutcome::Done)
    }

    /// Restore the token's backup (an empty update when there is none)
    pub async fn reset_light(&self, target: &TargetId) -> LightResult<ToggleOutcome> {
        let Some(_claim) = self.busy.claim(target) else {
            debug!(target = %target, "Token busy, dropping reset");
            return Ok(ToggleOutcome::Busy);
        };
        self.reset_claimed(target).await?;
        Ok(ToggleOutcome::Done)
    }

    /// HUD "on": apply the token's chosen preset, or `default_key`
    pub async fn toggle_on(
        &self,
        target: &TargetId,
        default_key: &str,
        table: &PresetTable,
        max_radius: Option<f64>,
    ) -> ToggleOutcome {
        let Some(_claim) = self.busy.claim(target) else {
            debug!(target = %target, "Token busy, dropping toggle on");
            return ToggleOutcome::Busy;
        };
        let key = self.chosen_model(target).unwrap_or_else(|| default_key.to_string());
        match self.apply_claimed(target, &key, table, max_radius).await {
            Ok(()) => {
                info!(target = %target, preset = %key, "light on");
                ToggleOutcome::Done
            }
            Err(e) => {
                error!(target = %target, preset = %key, error = %e, "Failed to apply light");
                ToggleOutcome::Failed(e)
            }
        }
    }

    /// HUD "off": restore the backup
    pub async fn toggle_off(&self, target: &TargetId) -> ToggleOutcome {
        let Some(_claim) = self.busy.claim(target) else {
            debug!(target = %target, "Token busy, dropping toggle off");
            return ToggleOutcome::Busy;
        };
        match self.reset_claimed(target).await {
            Ok(()) => {
                info!(target = %target, "light off");
                ToggleOutcome::Done
            }
            Err(e) => {
                error!(target = %target, error = %e, "Failed to reset light");
                ToggleOutcome::Failed(e)
            }
        }
    }

    /// Transient write used by live preview: backup first, state untouched
    pub async fn push_preview(&self, target: &TargetId, update: &LightUpdate) -> LightResult<()> {
        self.ensure_exists(target)?;
        self.ensure_backup(target).await?;
        self.targets.update_light(target, update).await
    }

    async fn apply_claimed(
        &self,
        target: &TargetId,
        key: &str,
        table: &PresetTable,
        max_radius: Option<f64>,
    ) -> LightResult<()> {
        let preset = table.get(key).ok_or_else(|| LightError::preset_not_found(key))?;
        self.ensure_exists(target)?;
        self.ensure_backup(target).await?;

        let normalized = PresetEngine::normalize_preset(preset, max_radius);
        self.targets.update_light(target, &LightUpdate::from_preset(&normalized)).await?;
        self.targets
            .set_flag(target, MODULE_ID, LIGHT_ICON_STATE, Value::from(LightState::On.as_str()))
            .await?;
        self.targets.set_flag(target, MODULE_ID, CHOSEN_MODEL, Value::from(key)).await?;
        Ok(())
    }

    async fn reset_claimed(&self, target: &TargetId) -> LightResult<()> {
        self.ensure_exists(target)?;
        let backup = self.backup(target).unwrap_or_default();
        self.targets.update_light(target, &backup).await?;
        self.targets
            .set_flag(target, MODULE_ID, LIGHT_ICON_STATE, Value::from(LightState::Off.as_str()))
            .await?;
        Ok(())
    }
}
