//! Config command - view and manage the gdmirror configuration
//!
//! Provides the `gdmirror config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Writes a default configuration file

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use gdmirror_core::config::Config;

use crate::output::{get_formatter, OutputFormat};
use crate::Session;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(session),
            ConfigCommand::Validate => execute_validate(session),
            ConfigCommand::Init { force } => execute_init(session, *force),
        }
    }
}

fn execute_show(session: &Session) -> Result<()> {
    let formatter = get_formatter(session.format, session.quiet);
    info!(config_path = %session.config_path.display(), "Showing configuration");

    if session.format == OutputFormat::Json {
        let json = serde_json::to_value(&session.config)
            .context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", session.config_path.display()));
        formatter.info("");

        let yaml = serde_yaml::to_string(&session.config)
            .context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            // show stays useful under --quiet
            println!("  {line}");
        }
    }

    Ok(())
}

fn execute_validate(session: &Session) -> Result<()> {
    let formatter = get_formatter(session.format, session.quiet);
    let config_path = &session.config_path;

    // Re-read the file: the session config silently falls back to defaults
    let config = match Config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            let message = if config_path.exists() {
                format!("Failed to parse configuration: {e}")
            } else {
                "Configuration file not found. Using defaults.".to_string()
            };

            if session.format == OutputFormat::Json {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [message],
                }));
            } else {
                formatter.error(&message);
                formatter.info(&format!("File: {}", config_path.display()));
                if !config_path.exists() {
                    formatter.info("Run 'gdmirror config init' to create one.");
                }
            }
            return Ok(());
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");

    let errors = config.validate();

    if session.format == OutputFormat::Json {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(())
}

/// Writes `Config::default()` as YAML, creating parent directories.
fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }

    let yaml = serde_yaml::to_string(&Config::default()).context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")?;
    Ok(())
}

fn execute_init(session: &Session, force: bool) -> Result<()> {
    let formatter = get_formatter(session.format, session.quiet);
    write_default_config(&session.config_path, force)?;

    info!(config_path = %session.config_path.display(), "Wrote default configuration");

    if session.format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "config_path": session.config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Created {}", session.config_path.display()));
    }
    Ok(())
}
