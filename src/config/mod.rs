//! Preset configuration
//!
//! - **preset**: the light preset model and built-in defaults
//! - **schema**: declarative field schema used to sanitize persisted presets
//! - **store**: load/save of the preset table through the settings backend
//! - **settings**: typed accessors for the module's other world settings

pub mod preset;
pub mod schema;
pub mod settings;
pub mod store;

pub use preset::{AnimationChanges, LightAnimation, LightPreset, PresetChanges, PresetTable, default_presets};
pub use settings::{LightIcon, ModuleSettings};
pub use store::PresetStore;
