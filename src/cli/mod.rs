//! CLI module for web-experiment
//!
//! Runs experiments against a browser profile kept on disk:
//! - `assign`: attach an experiment described by a page file
//! - `show`: print the stored assignment of an experiment
//! - `clear`: forget the stored assignment of an experiment

pub mod assign;
pub mod clear;
pub mod show;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::experiment::{ExperimentValidationError, StorageBackend};
use crate::infrastructure::logging;

/// web-experiment - Sticky A/B variant assignment
#[derive(Parser)]
#[command(name = "web-experiment")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Assign a variant for the experiment described in a page file
    Assign(assign::AssignArgs),

    /// Show the stored variant of an experiment
    Show(StoredVariantArgs),

    /// Clear the stored variant of an experiment
    Clear(StoredVariantArgs),
}

/// Arguments shared by commands that address one stored assignment
#[derive(Args, Clone)]
pub struct StoredVariantArgs {
    /// Experiment identifier
    #[arg(long)]
    pub experiment_id: String,

    /// Storage backend (cookie or local)
    #[arg(long, default_value = "cookie", value_parser = parse_backend)]
    pub storage: StorageBackend,

    /// Profile file (overrides config)
    #[arg(long)]
    pub profile: Option<PathBuf>,
}

fn parse_backend(value: &str) -> Result<StorageBackend, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "cookie" => Ok(StorageBackend::Cookie),
        "local" => Ok(StorageBackend::Local),
        other => {
            Err(ExperimentValidationError::UnknownStorageBackend(other.to_string()).to_string())
        }
    }
}

/// Load configuration and start logging
fn bootstrap(debug: bool) -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&logging_config(&config, debug));

    config
}

/// Logging settings for a run; any debug switch raises the level
fn logging_config(config: &AppConfig, debug: bool) -> logging::LoggingConfig {
    logging::LoggingConfig {
        level: config.logging.level.clone(),
        format: config.logging.format.clone(),
        debug_mode: debug || config.debug_mode,
    }
}

fn profile_path(arg: Option<PathBuf>, config: &AppConfig) -> PathBuf {
    arg.unwrap_or_else(|| PathBuf::from(&config.profile.path))
}
