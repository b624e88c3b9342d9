//! Declarative preset schema and the generic sanitize routine
//!
//! Persisted preset records are validated in two tiers:
//! - strict shape check: a required field missing, or a scalar where an
//!   object is expected (or the reverse), replaces the whole record with the default
//! - permissive merge: otherwise candidate values are merged onto the default,
//!   each coerced to the field's kind; values that cannot be coerced keep the default

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::preset::is_hex_color;
use crate::constants::preset::{MAX_ANGLE, MAX_ANIMATION_LEVEL};

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    /// Text that may also be `null`
    NullableText,
    /// `#rgb` / `#rrggbb`
    Color,
    /// Finite number clamped into `[min, max]`
    Number { min: f64, max: f64 },
    /// Integer in `0..=MAX_ANIMATION_LEVEL`
    Level,
    Object(&'static [FieldSpec]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: true }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false }
    }
}

const RADIUS: FieldKind = FieldKind::Number { min: 0.0, max: f64::INFINITY };
const FRACTION: FieldKind = FieldKind::Number { min: 0.0, max: 1.0 };

pub const ANIMATION_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("type", FieldKind::NullableText),
    FieldSpec::required("speed", FieldKind::Level),
    FieldSpec::required("intensity", FieldKind::Level),
];

pub const PRESET_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::Text),
    FieldSpec::required("dim", RADIUS),
    FieldSpec::required("bright", RADIUS),
    FieldSpec::required("color", FieldKind::Color),
    FieldSpec::required("angle", FieldKind::Number { min: 0.0, max: MAX_ANGLE }),
    FieldSpec::required("alpha", FRACTION),
    FieldSpec::optional("intensity", FRACTION),
    FieldSpec::required("animation", FieldKind::Object(ANIMATION_SCHEMA)),
];

/// Result of sanitizing one record
#[derive(Debug, Clone, PartialEq)]
pub enum Sanitized {
    /// Candidate merged onto the default
    Merged(Value),
    /// Candidate absent or shape mismatch; carries the default and the reason
    Fallback { value: Value, reason: String },
}

impl Sanitized {
    pub fn into_value(self) -> Value {
        match self {
            Sanitized::Merged(value) | Sanitized::Fallback { value, .. } => value,
        }
    }
}

/// First top-level field whose presence or shape disagrees with the schema
pub fn shape_mismatch(schema: &[FieldSpec], candidate: &Map<String, Value>) -> Option<String> {
    for spec in schema {
        match candidate.get(spec.name) {
            None if spec.required => return Some(format!("missing field '{}'", spec.name)),
            None => {}
            Some(value) => {
                let expects_object = matches!(spec.kind, FieldKind::Object(_));
                let shape_ok = match value {
                    Value::Null => !expects_object,
                    Value::Object(_) => expects_object,
                    Value::Array(_) => false,
                    Value::String(_) => matches!(
                        spec.kind,
                        FieldKind::Text | FieldKind::NullableText | FieldKind::Color
                    ),
                    Value::Number(_) => {
                        matches!(spec.kind, FieldKind::Number { .. } | FieldKind::Level)
                    }
                    Value::Bool(_) => false,
                };
                if !shape_ok {
                    return Some(format!("field '{}' has the wrong type", spec.name));
                }
            }
        }
    }
    None
}

fn coerce(kind: FieldKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (FieldKind::Text, Value::String(_)) => Some(value.clone()),
        (FieldKind::NullableText, Value::String(_) | Value::Null) => Some(value.clone()),
        (FieldKind::Color, Value::String(s)) if is_hex_color(s) => Some(value.clone()),
        (FieldKind::Number { min, max }, Value::Number(n)) => {
            let n = n.as_f64().filter(|n| n.is_finite())?;
            Some(Value::from(n.clamp(min, max)))
        }
        (FieldKind::Level, Value::Number(n)) => {
            let n = n.as_f64().filter(|n| n.is_finite())?;
            Some(Value::from(n.round().clamp(0.0, f64::from(MAX_ANIMATION_LEVEL)) as u64))
        }
        _ => None,
    }
}

/// Merge `candidate` onto `default` field by field, enforcing each field's kind.
/// Keys unknown to the schema are dropped.
pub fn merge(schema: &[FieldSpec], default: &Map<String, Value>, candidate: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = Map::new();
    for spec in schema {
        let fallback = default.get(spec.name);
        let value = match (spec.kind, candidate.get(spec.name)) {
            (FieldKind::Object(fields), Some(Value::Object(inner))) => {
                let empty = Map::new();
                let inner_default = fallback.and_then(Value::as_object).unwrap_or(&empty);
                Some(Value::Object(merge(fields, inner_default, inner)))
            }
            (kind, Some(raw)) => match coerce(kind, raw) {
                Some(value) => Some(value),
                None => {
                    debug!(field = spec.name, value = %raw, "Ignoring value that does not match field kind");
                    fallback.cloned()
                }
            },
            (_, None) => fallback.cloned(),
        };
        if let Some(value) = value {
            merged.insert(spec.name.to_string(), value);
        }
    }
    merged
}

/// Two-tier sanitation of one record against its default
pub fn sanitize_record(schema: &[FieldSpec], default: &Value, candidate: Option<&Value>) -> Sanitized {
    let Some(default_map) = default.as_object() else {
        return Sanitized::Fallback { value: default.clone(), reason: "default is not an object".into() };
    };
    let candidate_map = match candidate {
        None | Some(Value::Null) => {
            return Sanitized::Fallback { value: default.clone(), reason: "missing".into() };
        }
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Sanitized::Fallback { value: default.clone(), reason: "not an object".into() };
        }
    };
    if let Some(reason) = shape_mismatch(schema, candidate_map) {
        return Sanitized::Fallback { value: default.clone(), reason };
    }
    Sanitized::Merged(Value::Object(merge(schema, default_map, candidate_map)))
}
