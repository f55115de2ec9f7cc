//! Standalone mod host
//!
//! Runs the full loading pipeline against a mods directory with in-memory
//! host collaborators and reports what survived. Useful for validating a mod
//! set without starting the game.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use catan_mods::config::ModLoaderConfig;
use catan_mods::mods::{HostServices, ModPipeline};
use catan_mods::utils::init_logging_from_config;

#[derive(Parser)]
#[command(name = "catan-modhost", about = "Load and validate a directory of mods")]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mods directory (overrides the config file)
    #[arg(long)]
    mods_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ModLoaderConfig::from_toml_file(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load config {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => ModLoaderConfig::default(),
    };
    if let Some(mods_dir) = args.mods_dir {
        config.mods_dir = mods_dir;
    }

    init_logging_from_config(config.logging.as_ref());

    let pipeline = ModPipeline::from_config(&config);
    let mut host = HostServices::in_memory();
    match pipeline.load_all(&mut host) {
        Ok(live) => {
            println!("loaded {} mod(s) from {}", live.len(), config.mods_dir.display());
            for module in &live {
                println!(
                    "  {} v{} ({})",
                    module.metadata.id, module.metadata.version, module.metadata.name
                );
            }
            println!(
                "registered {} content entries, {} assets, {} listeners",
                host.registry.count(),
                host.assets.count(),
                host.events.count()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("mod loading failed: {err}");
            ExitCode::FAILURE
        }
    }
}
