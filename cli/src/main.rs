mod logging;
mod service;
mod setup;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use deathwatch_core::config::default_config_path;
use deathwatch_core::save::read_save_file;
use deathwatch_core::{AppConfigExt, Profile, resolve_save_path};
use deathwatch_types::AppConfig;
use deathwatch_types::formatting::{format_playtime, format_thousands};
use tracing::{error, info, warn};

use crate::logging::init_logging;
use crate::service::run_service;
use crate::setup::run_setup_wizard;

#[derive(Parser)]
#[command(version, about = "Live Elden Ring death counter")]
struct Cli {
    /// Path to config.json (defaults to the executable's directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the setup wizard and overwrite the config
    Setup,
    /// List the characters in a save file
    List {
        /// Save file to read instead of the configured or detected one
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Print the characters as a JSON array
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let _log_guard = init_logging();
    let cli = Cli::parse();

    let Some(config_path) = cli.config.or_else(default_config_path) else {
        error!("Could not determine the config file location; pass --config");
        return ExitCode::FAILURE;
    };

    match cli.command {
        None => run(&config_path),
        Some(Commands::Setup) => match run_setup_wizard(&config_path) {
            Some(_) => ExitCode::SUCCESS,
            None => ExitCode::FAILURE,
        },
        Some(Commands::List { save, json }) => list(&config_path, save, json),
    }
}

fn run(config_path: &Path) -> ExitCode {
    let config = match AppConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "No usable config, starting setup");
            match run_setup_wizard(config_path) {
                Some(config) => config,
                None => return ExitCode::FAILURE,
            }
        }
    };

    let output_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(1)
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        slot = config.character_slot,
        web = config.enable_web_ui,
        text = config.enable_text_file,
        "Starting monitor"
    );

    match runtime.block_on(run_service(config, &output_dir)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Monitor failed");
            ExitCode::FAILURE
        }
    }
}

fn list(config_path: &Path, save: Option<PathBuf>, json: bool) -> ExitCode {
    let save_path = match save {
        Some(path) => path,
        None => {
            let config = AppConfig::load(config_path).ok();
            match resolve_save_path(config.as_ref()) {
                Ok(path) => path,
                Err(e) => {
                    error!(error = %e, "Could not find save file");
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    let profiles = match read_save_file(&save_path) {
        Ok(profiles) => profiles,
        Err(e) => {
            error!(error = %e, path = %save_path.display(), "Error reading save file");
            return ExitCode::FAILURE;
        }
    };

    match render_profiles(&profiles, json) {
        Ok(listing) => {
            println!("{listing}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to encode character list");
            ExitCode::FAILURE
        }
    }
}

fn render_profiles(profiles: &[Profile], json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string_pretty(profiles);
    }
    if profiles.is_empty() {
        return Ok("No active characters found in save file.".to_string());
    }

    let lines: Vec<String> = profiles
        .iter()
        .map(|p| {
            format!(
                "Slot {}: {} (Level {}, {}, {} deaths)",
                p.slot_index,
                p.name,
                p.level,
                format_playtime(p.play_time),
                format_thousands(p.deaths)
            )
        })
        .collect();
    Ok(lines.join("\n"))
}
