//! Token HUD controls
//!
//! Pure view-model for the two toggle buttons drawn on a token's HUD. The
//! host renders them; clicks come back as [`HudAction`]s.

use crate::config::settings::LightIcon;
use crate::constants::hud::{FEU_OFF, FEU_ON, LAMPE_OFF, LAMPE_ON};
use crate::constants::preset::DEFAULT_PRESET_KEY;
use crate::panel::PanelOptions;
use crate::token::{LightState, TargetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HudButton {
    pub icon: &'static str,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HudControls {
    pub on: HudButton,
    pub off: HudButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudAction {
    /// Left click on the "on" button
    On,
    /// Left click on the "off" button
    Off,
    /// Right click on either button
    OpenPanel,
}

/// `None` when the controls are hidden for this user
pub fn hud_controls(token_button: bool, is_gm: bool, icon: LightIcon, state: LightState) -> Option<HudControls> {
    if !token_button && !is_gm {
        return None;
    }
    let (on_icon, off_icon) = match icon {
        LightIcon::Lampe => (LAMPE_ON, LAMPE_OFF),
        LightIcon::Feu => (FEU_ON, FEU_OFF),
    };
    let off = state == LightState::Off;
    Some(HudControls {
        on: HudButton { icon: on_icon, visible: off },
        off: HudButton { icon: off_icon, visible: !off },
    })
}

/// Panel options for a right click on the HUD of `token`
pub fn panel_options_for(token: &TargetId, chosen_model: Option<&str>) -> PanelOptions {
    let key = chosen_model
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(DEFAULT_PRESET_KEY);
    PanelOptions {
        selected_light_key: Some(key.to_string()),
        token_id: Some(token.clone()),
        apply_on_save: true,
    }
}
