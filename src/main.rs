#![forbid(unsafe_code)]

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{Level as TraceLevel, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands, TokenCommands};
use lampe_torche::config::preset::{AnimationChanges, is_hex_color};
use lampe_torche::constants::preset::NO_ANIMATION;
use lampe_torche::{
    FileHost, LightService, LightState, NoticeLevel, PresetChanges, PresetEvent, TargetId, ToggleOutcome,
    TokenLight,
};

type Service = LightService<Arc<FileHost>, Arc<FileHost>>;

fn init_tracing() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let path = cli.state.unwrap_or_else(FileHost::default_path);
    let host = Arc::new(FileHost::open(&path)?);
    info!("Using host state {:?}", host.path());

    let service = LightService::new(host.clone(), host.clone());
    let mut events = service.subscribe();
    service.start().await.context("Failed to load light presets")?;

    let result = run(&service, &host, cli.command).await;
    log_notices(&mut events);
    result
}

fn require_done(outcome: ToggleOutcome, token: &TargetId) -> Result<()> {
    match outcome {
        ToggleOutcome::Done => Ok(()),
        ToggleOutcome::Busy => bail!("Token {token} is busy"),
        ToggleOutcome::Failed(e) => Err(e).with_context(|| format!("Light change on token {token} failed")),
    }
}

async fn run(service: &Service, host: &FileHost, command: Commands) -> Result<()> {
    match command {
        Commands::Presets { json } => {
            let models = service.models();
            if json {
                println!("{}", serde_json::to_string_pretty(&models)?);
            } else {
                for (key, preset) in &models {
                    println!(
                        "{key:<14} dim {:>6} bright {:>6} angle {:>5} {} {}",
                        preset.dim,
                        preset.bright,
                        preset.angle,
                        preset.color,
                        preset.animation.kind.as_deref().unwrap_or(NO_ANIMATION)
                    );
                }
            }
        }
        Commands::Apply { token, preset } => {
            let token = TargetId::new(token);
            match preset {
                Some(key) => {
                    service
                        .apply_light(&token, &key)
                        .await
                        .with_context(|| format!("Failed to apply {key} to {token}"))?;
                }
                None => require_done(service.light_on(&token).await, &token)?,
            }
        }
        Commands::Off { token } => {
            let token = TargetId::new(token);
            require_done(service.light_off(&token).await, &token)?;
        }
        Commands::Toggle { token } => {
            let token = TargetId::new(token);
            let outcome = match service.controller().state(&token) {
                LightState::On => service.light_off(&token).await,
                LightState::Off => service.light_on(&token).await,
            };
            require_done(outcome, &token)?;
            println!("{}", service.controller().state(&token).as_str());
        }
        Commands::ResetPresets => {
            let table = service.reset_presets().await.context("Failed to reset presets")?;
            println!("Reset {} presets", table.len());
        }
        Commands::MaxRadius { value } => match value {
            Some(value) => {
                let stored = service
                    .set_max_radius(value)
                    .await
                    .context("Failed to update max radius")?;
                println!("{stored}");
            }
            None => println!("{}", service.settings().max_radius_setting()),
        },
        Commands::Edit {
            preset,
            dim,
            bright,
            color,
            angle,
            intensity,
            animation,
        } => {
            if let Some(color) = color.as_deref().filter(|c| !is_hex_color(c)) {
                bail!("Invalid color {color:?}, expected #rgb or #rrggbb");
            }
            let changes = PresetChanges {
                dim,
                bright,
                color,
                angle,
                intensity: intensity.map(|i| i.clamp(0.0, 1.0)),
                animation: animation.map(|kind| AnimationChanges {
                    kind: Some(Some(kind).filter(|k| k.as_str() != NO_ANIMATION)),
                    ..Default::default()
                }),
                ..Default::default()
            };
            if changes.is_empty() {
                warn!(preset = %preset, "No fields to change");
                return Ok(());
            }
            let saved = service
                .update_preset(&preset, &changes)
                .await
                .with_context(|| format!("Failed to update preset {preset}"))?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        Commands::Token { command } => match command {
            TokenCommands::Add { id, dim, bright, color } => {
                let light = TokenLight { dim, bright, color, ..TokenLight::default() };
                host.add_token(TargetId::new(id.as_str()), light)
                    .with_context(|| format!("Failed to add token {id}"))?;
                info!(token = %id, "Added token");
            }
            TokenCommands::Show { id } => {
                let token = host
                    .token(&TargetId::new(id.as_str()))
                    .with_context(|| format!("Token {id} not found"))?;
                println!("{}", serde_json::to_string_pretty(&token)?);
            }
        },
    }
    Ok(())
}

fn log_notices(events: &mut broadcast::Receiver<PresetEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            PresetEvent::Notice(notice) => match notice.level {
                NoticeLevel::Info => info!(notice = %notice.message, "Notice"),
                NoticeLevel::Warn => warn!(notice = %notice.message, "Notice"),
                NoticeLevel::Error => error!(notice = %notice.message, "Notice"),
            },
            PresetEvent::PresetsReset { light } => info!(presets = light.len(), "Presets reset"),
        }
    }
}
