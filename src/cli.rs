use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lampe-torche", version, about = "Token light presets over a JSON host state file")]
pub struct Cli {
    /// Host state file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the preset table
    Presets {
        #[arg(long, alias = "jq")]
        json: bool,
    },
    /// Turn a token's light on with a preset (its chosen one by default)
    Apply {
        token: String,
        preset: Option<String>,
    },
    /// Restore a token's light from its backup
    Off {
        token: String,
    },
    /// Flip a token's light between on and off
    Toggle {
        token: String,
    },
    /// Replace the preset table with the built-in defaults
    ResetPresets,
    /// Show or set the max light radius (0 = unlimited)
    MaxRadius {
        value: Option<f64>,
    },
    /// Edit fields of one preset
    Edit {
        preset: String,
        #[arg(long)]
        dim: Option<f64>,
        #[arg(long)]
        bright: Option<f64>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        angle: Option<f64>,
        #[arg(long)]
        intensity: Option<f64>,
        /// Animation type, `none` to clear
        #[arg(long)]
        animation: Option<String>,
    },
    /// Manage tokens in the host state file
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Register a token with an unlit light
    Add {
        id: String,
        #[arg(long, default_value_t = 0.0)]
        dim: f64,
        #[arg(long, default_value_t = 0.0)]
        bright: f64,
        #[arg(long)]
        color: Option<String>,
    },
    /// Print a token's light and flags
    Show {
        id: String,
    },
}
