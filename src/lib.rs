#![forbid(unsafe_code)]

//! Light presets for tabletop tokens: a sanitized, radius-capped preset
//! table, per-token on/off with a one-time light backup, and debounced live
//! preview of unsaved edits.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod host;
pub mod hud;
pub mod panel;
pub mod preview;
pub mod radius;
pub mod service;
pub mod token;

pub use config::{LightPreset, PresetChanges, PresetTable};
pub use engine::PresetEngine;
pub use error::{LightError, LightResult};
pub use host::{FileHost, SettingsStore, TargetStore};
pub use service::{LightService, Notice, NoticeLevel, PresetEvent};
pub use token::{LightState, TargetId, ToggleOutcome, TokenLight, TokenLightController};
