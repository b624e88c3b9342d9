//! Radius policy
//!
//! Pure functions that keep a light's dim/bright pair non-negative, under the
//! optional global cap, and ordered so that `dim >= bright`.
//!
//! Tie-break: both radii are clamped independently first and only then
//! reconciled with `dim = max(dim, bright)`. A bright value above the cap is
//! truncated before the comparison, so the original gap between the two radii
//! is not preserved.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dim/bright pair after normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Radii {
    pub dim: f64,
    pub bright: f64,
}

/// Loose numeric coercion for values coming out of persisted settings or forms.
/// Numbers pass through, numeric strings are parsed, booleans map to 0/1,
/// `null` and empty strings are 0. Everything else is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                s.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        _ => None,
    }
}

fn active_cap(max_radius: Option<f64>) -> Option<f64> {
    max_radius.filter(|m| m.is_finite() && *m > 0.0)
}

/// Floor at 0 (non-finite becomes 0) and cap at `max_radius` when it is a
/// finite positive number.
pub fn clamp_radius(value: f64, max_radius: Option<f64>) -> f64 {
    let floored = if value.is_finite() { value.max(0.0) } else { 0.0 };
    match active_cap(max_radius) {
        Some(cap) => floored.min(cap),
        None => floored,
    }
}

pub fn normalize_radii(dim: f64, bright: f64, max_radius: Option<f64>) -> Radii {
    let dim = clamp_radius(dim, max_radius);
    let bright = clamp_radius(bright, max_radius);
    Radii {
        dim: dim.max(bright),
        bright,
    }
}

/// Value written to the max radius setting: non-negative, two decimals.
pub fn normalize_max_radius_setting_value(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value.max(0.0) * 100.0).round() / 100.0;
    // -0.0 after rounding tiny negatives
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Cap used by clamp operations. `None` means unlimited.
pub fn normalize_max_radius_limit(value: f64) -> Option<f64> {
    let normalized = normalize_max_radius_setting_value(value);
    if normalized > 0.0 { Some(normalized) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLES: [f64; 11] = [
        -5.0, -0.5, 0.0, 0.25, 3.0, 6.0, 10.0, 12.0, 15.0, 99.9, 1e9,
    ];
    const CAPS: [Option<f64>; 6] = [None, Some(0.0), Some(-3.0), Some(5.5), Some(10.0), Some(f64::INFINITY)];

    #[test]
    fn test_clamp_radius_floors_and_caps() {
        assert_eq!(clamp_radius(-4.0, None), 0.0);
        assert_eq!(clamp_radius(f64::NAN, Some(10.0)), 0.0);
        assert_eq!(clamp_radius(f64::INFINITY, None), 0.0);
        assert_eq!(clamp_radius(12.0, Some(10.0)), 10.0);
        assert_eq!(clamp_radius(8.0, Some(10.0)), 8.0);
    }

    #[test]
    fn test_clamp_radius_ignores_non_positive_or_infinite_cap() {
        assert_eq!(clamp_radius(120.0, Some(0.0)), 120.0);
        assert_eq!(clamp_radius(120.0, Some(-1.0)), 120.0);
        assert_eq!(clamp_radius(120.0, Some(f64::INFINITY)), 120.0);
        assert_eq!(clamp_radius(120.0, Some(f64::NAN)), 120.0);
    }

    #[test]
    fn test_normalize_radii_invariants_hold_over_grid() {
        for &dim in &SAMPLES {
            for &bright in &SAMPLES {
                for &cap in &CAPS {
                    let r = normalize_radii(dim, bright, cap);
                    assert!(r.dim >= r.bright, "dim {dim} bright {bright} cap {cap:?}");
                    assert!(r.bright >= 0.0);
                    if let Some(m) = cap.filter(|m| m.is_finite() && *m > 0.0) {
                        assert!(r.dim <= m && r.bright <= m);
                    }
                    // normalizing twice changes nothing
                    assert_eq!(normalize_radii(r.dim, r.bright, cap), r);
                }
            }
        }
    }

    #[test]
    fn test_null_and_zero_cap_are_both_unlimited() {
        for &dim in &SAMPLES {
            for &bright in &SAMPLES {
                assert_eq!(normalize_radii(dim, bright, None), normalize_radii(dim, bright, Some(0.0)));
            }
        }
    }

    #[test]
    fn test_bright_above_cap_is_truncated_before_reconcile() {
        assert_eq!(normalize_radii(12.0, 6.0, Some(10.0)), Radii { dim: 10.0, bright: 6.0 });
        assert_eq!(normalize_radii(12.0, 15.0, Some(10.0)), Radii { dim: 10.0, bright: 10.0 });
        assert_eq!(normalize_radii(2.0, 8.0, None), Radii { dim: 8.0, bright: 8.0 });
    }

    #[test]
    fn test_max_radius_setting_value_rounding() {
        assert_eq!(normalize_max_radius_setting_value(12.346), 12.35);
        assert_eq!(normalize_max_radius_setting_value(12.344), 12.34);
        assert_eq!(normalize_max_radius_setting_value(-3.0), 0.0);
        assert_eq!(normalize_max_radius_setting_value(f64::NAN), 0.0);
        assert_eq!(normalize_max_radius_setting_value(-0.001), 0.0);
        assert!(normalize_max_radius_setting_value(-0.001).is_sign_positive());
    }

    #[test]
    fn test_max_radius_limit() {
        assert_eq!(normalize_max_radius_limit(0.0), None);
        assert_eq!(normalize_max_radius_limit(-2.0), None);
        assert_eq!(normalize_max_radius_limit(0.001), None);
        assert_eq!(normalize_max_radius_limit(60.0), Some(60.0));
    }

    #[test]
    fn test_coerce_number_is_loose() {
        assert_eq!(coerce_number(&json!(60)), Some(60.0));
        assert_eq!(coerce_number(&json!(" 10.5 ")), Some(10.5));
        assert_eq!(coerce_number(&json!("")), Some(0.0));
        assert_eq!(coerce_number(&json!(null)), Some(0.0));
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!({"x": 1})), None);
    }
}
