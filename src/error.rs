//! Error taxonomy for preset and token light operations
//!
//! None of these are fatal to the host: callers log them and degrade to a no-op.

use crate::token::TargetId;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LightError {
    #[error("preset '{key}' not found")]
    PresetNotFound { key: String },

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("token '{target}' not found")]
    TargetNotFound { target: TargetId },
}

impl LightError {
    pub fn preset_not_found(key: impl Into<String>) -> Self {
        Self::PresetNotFound { key: key.into() }
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for LightError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(format!("json error: {err}"))
    }
}

pub type LightResult<T> = Result<T, LightError>;
