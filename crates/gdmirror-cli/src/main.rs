//! gdmirror CLI - one-way Google Drive mirror
//!
//! Provides commands for:
//! - Mirroring every visible Drive folder tree to a local directory
//! - Validating service-account credential files
//! - Inspecting and initializing the configuration file
//! - Generating shell completions

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gdmirror_core::config::{Config, LoggingConfig};

mod commands;
mod output;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, credentials::CredentialsCommand,
    sync::SyncCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "gdmirror", version, about = "Mirror Google Drive folders to local disk")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mirror all remote folders into the download root
    Sync(SyncCommand),
    /// Service-account credential commands
    #[command(subcommand)]
    Credentials(CredentialsCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Global settings every command runs with
pub struct Session {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub config: Config,
}

/// Loads the configuration file.
///
/// An explicitly given file must exist and parse; the default location
/// falls back to built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, Config)> {
    match explicit {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            Ok((path.to_path_buf(), config))
        }
        None => {
            let path = Config::default_path();
            let config = Config::load_or_default(&path);
            Ok((path, config))
        }
    }
}

/// Filter used when `RUST_LOG` is not set
fn default_log_filter(verbose: u8, quiet: bool, logging: &LoggingConfig) -> String {
    match verbose {
        0 if !logging.enabled => "off".to_string(),
        0 if quiet => "error".to_string(),
        0 => logging.level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(cli: &Cli, logging: &LoggingConfig) {
    let filter = default_log_filter(cli.verbose, cli.quiet, logging);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config_path, config) = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &config.logging);

    let session = Session {
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        quiet: cli.quiet,
        config_path,
        config,
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(session).await,
        Commands::Credentials(cmd) => cmd.execute(&session),
        Commands::Config(cmd) => cmd.execute(&session),
        Commands::Completions(cmd) => cmd.execute(),
    }
}
