//! Token-side light data: identity, current light, partial light updates

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::config::preset::LightPreset;

/// Identity of a target token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Whether a preset is currently active on the token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    On,
    #[default]
    Off,
}

impl LightState {
    pub fn as_str(self) -> &'static str {
        match self {
            LightState::On => "on",
            LightState::Off => "off",
        }
    }

    /// Anything but `"on"` (including absence) reads as off
    pub fn from_flag(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("on") => LightState::On,
            _ => LightState::Off,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAnimation {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default = "default_animation_level")]
    pub speed: u8,
    #[serde(default = "default_animation_level")]
    pub intensity: u8,
}

fn default_animation_level() -> u8 {
    5
}

impl Default for TokenAnimation {
    fn default() -> Self {
        Self {
            kind: None,
            speed: default_animation_level(),
            intensity: default_animation_level(),
        }
    }
}

/// A token's current light configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenLight {
    pub bright: f64,
    pub dim: f64,
    pub angle: f64,
    pub color: Option<String>,
    pub alpha: f64,
    pub intensity: f64,
    pub animation: TokenAnimation,
}

impl Default for TokenLight {
    fn default() -> Self {
        Self {
            bright: 0.0,
            dim: 0.0,
            angle: 360.0,
            color: None,
            alpha: 0.5,
            intensity: 0.5,
            animation: TokenAnimation::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationUpdate {
    /// Always written; `None` clears the animation
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u8>,
}

/// Partial light update; absent fields are left untouched on the token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    /// `Some(None)` clears the color
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_present")]
    pub color: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationUpdate>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`)
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl LightUpdate {
    /// Full light payload for a (normalized) preset
    pub fn from_preset(preset: &LightPreset) -> Self {
        Self {
            bright: Some(preset.bright),
            dim: Some(preset.dim),
            angle: Some(preset.angle),
            color: Some(Some(preset.color.clone())),
            alpha: Some(preset.alpha),
            intensity: Some(preset.intensity),
            animation: Some(AnimationUpdate {
                kind: preset.animation.kind.clone(),
                speed: Some(preset.animation.speed),
                intensity: Some(preset.animation.intensity),
            }),
        }
    }

    /// Backup of the fields a preset overwrites (animation type only)
    pub fn snapshot(light: &TokenLight) -> Self {
        Self {
            bright: Some(light.bright),
            dim: Some(light.dim),
            angle: Some(light.angle),
            color: Some(light.color.clone()),
            alpha: Some(light.alpha),
            intensity: Some(light.intensity),
            animation: Some(AnimationUpdate {
                kind: light.animation.kind.clone(),
                speed: None,
                intensity: None,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TokenLight {
    pub fn apply(&mut self, update: &LightUpdate) {
        if let Some(bright) = update.bright {
            self.bright = bright;
        }
        if let Some(dim) = update.dim {
            self.dim = dim;
        }
        if let Some(angle) = update.angle {
            self.angle = angle;
        }
        if let Some(color) = &update.color {
            self.color = color.clone();
        }
        if let Some(alpha) = update.alpha {
            self.alpha = alpha;
        }
        if let Some(intensity) = update.intensity {
            self.intensity = intensity;
        }
        if let Some(animation) = &update.animation {
            self.animation.kind = animation.kind.clone();
            if let Some(speed) = animation.speed {
                self.animation.speed = speed;
            }
            if let Some(intensity) = animation.intensity {
                self.animation.intensity = intensity;
            }
        }
    }
}
