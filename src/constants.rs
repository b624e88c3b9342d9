//! Module-wide constants
//!
//! Setting keys, flag names and tuning values shared across the crate,
//! providing a single source of truth for the host-facing identifiers.

/// Host namespace under which settings and token flags are stored
pub const MODULE_ID: &str = "bm-lampe-torche";

/// Persisted setting keys (world scope)
pub mod settings {
    /// Whole preset table
    pub const LIGHT_MODELS: &str = "lightModels";

    /// Whether players see the HUD toggle buttons
    pub const TOKEN_BUTTON: &str = "tokenButton";

    /// Icon pair used by the HUD buttons
    pub const LIGHT_ICON: &str = "lightIcon";

    /// Global cap on dim/bright radii (0 = unlimited)
    pub const MAX_LIGHT_RADIUS: &str = "maxLightRadius";

    /// Default cap in scene distance units
    pub const DEFAULT_MAX_LIGHT_RADIUS: f64 = 60.0;
}

/// Per-token flag names
pub mod flags {
    /// Last preset key applied to the token
    pub const CHOSEN_MODEL: &str = "chosenModel";

    /// "on" / "off"
    pub const LIGHT_ICON_STATE: &str = "lightIconState";

    /// Snapshot of the token light taken before the first preset
    pub const BASE_LIGHT: &str = "base_light";
}

/// Preset defaults and field bounds
pub mod preset {
    /// Preset used when a token has no chosen model yet
    pub const DEFAULT_PRESET_KEY: &str = "torchLight";

    /// Color used when a stored or submitted color is malformed
    pub const FALLBACK_COLOR: &str = "#ffffff";

    pub const DEFAULT_INTENSITY: f64 = 0.5;
    pub const DEFAULT_ANGLE: f64 = 360.0;
    pub const MAX_ANGLE: f64 = 360.0;

    /// Animation speed/intensity range (inclusive)
    pub const MAX_ANIMATION_LEVEL: u8 = 10;

    /// Form value meaning "no animation"
    pub const NO_ANIMATION: &str = "none";

    /// Localization prefix for built-in preset names
    pub const NAME_PREFIX: &str = "agnostic-light.ui.";
}

/// Live preview tuning
pub mod preview {
    /// Debounce window in milliseconds for coalescing field edits
    pub const DEBOUNCE_MS: u64 = 120;
}

/// Notice message keys (localized by the host)
pub mod notices {
    pub const LIGHT_RESET: &str = "agnostic-light.notifications.lightReset";
    pub const RESET_DONE: &str = "agnostic-light.notifications.resetDone";
    pub const PRESET_MISSING: &str = "BM Lampe Torche | Modele introuvable.";
    pub const SAVE_FAILED: &str = "BM Lampe Torche | Echec de la sauvegarde.";
}

/// File-backed host location
pub mod host {
    /// Directory under the user config dir
    pub const APP_DIR: &str = "bm-lampe-torche";

    /// JSON document holding settings and token state
    pub const FILENAME: &str = "host.json";
}

/// Token HUD icon classes
pub mod hud {
    pub const LAMPE_ON: &str = "fa-solid fa-flashlight";
    pub const LAMPE_OFF: &str = "fa-solid fa-lightbulb-slash";
    pub const FEU_ON: &str = "fa-regular fa-fire";
    pub const FEU_OFF: &str = "fa-solid fa-moon";
}

/// Service event fan-out
pub mod events {
    /// Broadcast buffer; slow listeners past this many events lag
    pub const CHANNEL_CAPACITY: usize = 16;
}
