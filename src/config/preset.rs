//! Light preset model
//!
//! A preset is a named bundle of light parameters applied to tokens. The table
//! of presets is keyed by a stable preset key (`torchLight`, `lamp`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::preset::{DEFAULT_INTENSITY, NAME_PREFIX};

/// Mapping preset key → preset. Ordered so the serialized form is stable.
pub type PresetTable = BTreeMap<String, LightPreset>;

/// Symbolic animation parameters. `kind = None` means no animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightAnimation {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub speed: u8,
    pub intensity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightPreset {
    pub name: String,
    pub dim: f64,
    pub bright: f64,
    pub color: String,
    pub angle: f64,
    pub alpha: f64,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    pub animation: LightAnimation,
}

fn default_intensity() -> f64 {
    DEFAULT_INTENSITY
}

/// Partial update of a preset; `None` leaves the field as is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetChanges {
    pub name: Option<String>,
    pub dim: Option<f64>,
    pub bright: Option<f64>,
    pub color: Option<String>,
    pub angle: Option<f64>,
    pub alpha: Option<f64>,
    pub intensity: Option<f64>,
    pub animation: Option<AnimationChanges>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationChanges {
    /// `Some(None)` clears the animation
    pub kind: Option<Option<String>>,
    pub speed: Option<u8>,
    pub intensity: Option<u8>,
}

impl PresetChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl LightPreset {
    /// Merge `changes` onto this preset, overlapping fields win
    pub fn apply_changes(&mut self, changes: &PresetChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(dim) = changes.dim {
            self.dim = dim;
        }
        if let Some(bright) = changes.bright {
            self.bright = bright;
        }
        if let Some(color) = &changes.color {
            self.color = color.clone();
        }
        if let Some(angle) = changes.angle {
            self.angle = angle;
        }
        if let Some(alpha) = changes.alpha {
            self.alpha = alpha;
        }
        if let Some(intensity) = changes.intensity {
            self.intensity = intensity;
        }
        if let Some(animation) = &changes.animation {
            if let Some(kind) = &animation.kind {
                self.animation.kind = kind.clone();
            }
            if let Some(speed) = animation.speed {
                self.animation.speed = speed;
            }
            if let Some(intensity) = animation.intensity {
                self.animation.intensity = intensity;
            }
        }
    }

    pub fn with_changes(&self, changes: &PresetChanges) -> Self {
        let mut next = self.clone();
        next.apply_changes(changes);
        next
    }
}

/// `#rgb` or `#rrggbb`
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

#[allow(clippy::too_many_arguments)]
fn builtin(
    key: &str,
    dim: f64,
    bright: f64,
    color: &str,
    angle: f64,
    alpha: f64,
    animation: (&str, u8, u8),
) -> (String, LightPreset) {
    let (kind, speed, intensity) = animation;
    (
        key.to_string(),
        LightPreset {
            name: format!("{NAME_PREFIX}{key}"),
            dim,
            bright,
            color: color.to_string(),
            angle,
            alpha,
            intensity: DEFAULT_INTENSITY,
            animation: LightAnimation {
                kind: Some(kind.to_string()),
                speed,
                intensity,
            },
        },
    )
}

/// Built-in presets shipped with the module
pub fn default_presets() -> PresetTable {
    PresetTable::from([
        builtin("torchLight", 12.0, 6.0, "#fab87a", 360.0, 0.5, ("flame", 5, 5)),
        builtin("lamp", 12.0, 9.0, "#ffa200", 360.0, 0.5, ("torch", 3, 3)),
        builtin("bullseye", 24.0, 18.0, "#ffa200", 45.0, 0.5, ("torch", 3, 3)),
        builtin("hoodedOpen", 24.0, 10.0, "#ffa200", 360.0, 0.5, ("torch", 3, 3)),
        builtin("hoodedClosed", 5.0, 0.0, "#ffa200", 360.0, 0.5, ("torch", 3, 3)),
        builtin("lightcantrip", 14.0, 7.0, "#fffab8", 360.0, 0.5, ("torch", 2, 1)),
        builtin("moontouched", 30.0, 15.0, "#38c0f3", 360.0, 0.5, ("torch", 1, 1)),
        builtin("sunlight", 60.0, 30.0, "#fff45c", 360.0, 0.6, ("torch", 1, 5)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_presets_are_well_formed() {
        let presets = default_presets();
        assert_eq!(presets.len(), 8);
        for (key, preset) in &presets {
            assert!(preset.dim >= preset.bright, "{key}");
            assert!(is_hex_color(&preset.color), "{key}");
            assert!(preset.name.ends_with(key.as_str()));
        }
        let torch = &presets["torchLight"];
        assert_eq!((torch.dim, torch.bright), (12.0, 6.0));
        assert_eq!(torch.animation.kind.as_deref(), Some("flame"));
        assert_eq!(presets["bullseye"].angle, 45.0);
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#fab87a"));
        assert!(is_hex_color("#FFF"));
        assert!(!is_hex_color("fab87a"));
        assert!(!is_hex_color("#fab87"));
        assert!(!is_hex_color("#ggg"));
        assert!(!is_hex_color("#ffffffff"));
    }

    #[test]
    fn test_apply_changes_only_touches_given_fields() {
        let mut preset = default_presets()["lamp"].clone();
        preset.apply_changes(&PresetChanges {
            bright: Some(4.0),
            animation: Some(AnimationChanges {
                kind: Some(None),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(preset.bright, 4.0);
        assert_eq!(preset.dim, 12.0);
        assert_eq!(preset.animation.kind, None);
        assert_eq!(preset.animation.speed, 3);
    }

    #[test]
    fn test_missing_intensity_deserializes_to_default() {
        let preset: LightPreset = serde_json::from_str(
            r##"{"name":"x","dim":1,"bright":0,"color":"#fff","angle":360,"alpha":0.5,
                "animation":{"type":null,"speed":0,"intensity":0}}"##,
        )
        .unwrap();
        assert_eq!(preset.intensity, DEFAULT_INTENSITY);
        assert_eq!(preset.animation.kind, None);
    }
}
