//! Token light state: data types and the per-token controller

mod controller;
mod light;

pub use controller::{ToggleOutcome, TokenLightController};
pub use light::{AnimationUpdate, LightState, LightUpdate, TargetId, TokenAnimation, TokenLight};
