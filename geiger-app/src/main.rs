//! `geiger` command-line entry point.
//!
//! ## Runtime note
//!
//! Live capture runs its pipeline in `spawn_blocking`, so `main` uses the
//! multi-threaded Tokio runtime. File commands are plain blocking calls.
//!
//! stdout carries detection output only; all logging goes to stderr.

mod cli;
mod commands;
mod output;
mod rate;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands, SettingsAction};
use geiger_core::GeigerError;
use settings::{default_settings_path, load_settings};
use tracing::{debug, error};

const DEFAULT_LOG_FILTER: &str = "geiger=info,geiger_core=info";

/// Exit status for configuration errors; everything else exits with 1.
const EXIT_CONFIG: u8 = 2;

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<GeigerError>() {
        Some(e) if e.is_config_error() => EXIT_CONFIG,
        _ => 1,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let settings = load_settings(&settings_path);
    debug!(path = %settings_path.display(), "settings loaded");

    match cli.command {
        Commands::Detect {
            input,
            detector,
            chunk_size,
            json,
        } => commands::detect(&settings, &input, &detector, chunk_size, json),
        Commands::Decimate {
            dead_time,
            input,
            output,
            chunk_size,
        } => commands::decimate(&settings, dead_time, &input, &output, chunk_size),
        Commands::Listen {
            detector,
            device,
            rate,
            json,
        } => commands::listen(&settings, &detector, device, rate, json).await,
        Commands::Devices { json } => commands::devices(json),
        Commands::Settings { action } => match action {
            SettingsAction::Show => commands::settings_show(&settings),
            SettingsAction::Save {
                detector,
                device,
                rate,
            } => commands::settings_save(&settings_path, settings, &detector, device, rate),
            SettingsAction::Path => {
                println!("{}", settings_path.display());
                Ok(())
            }
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}
