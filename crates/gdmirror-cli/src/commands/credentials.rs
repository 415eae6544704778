//! Credentials command - check a service-account key file offline

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use gdmirror_core::domain::{ServiceAccountCredentials, ServiceAccountValidator};
use gdmirror_core::ports::credential_validator::{CredentialReport, ICredentialValidator};

use crate::output::{get_formatter, OutputFormat};
use crate::Session;

#[derive(Debug, Subcommand)]
pub enum CredentialsCommand {
    /// Validate the format of a service-account JSON file
    Validate {
        /// Path to the JSON key file
        file: PathBuf,
    },
}

impl CredentialsCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        match self {
            CredentialsCommand::Validate { file } => execute_validate(file, session),
        }
    }
}

fn validate_file(file: &Path) -> Result<(ServiceAccountCredentials, CredentialReport)> {
    let credentials = ServiceAccountCredentials::load(file)
        .with_context(|| format!("Failed to read credentials from {}", file.display()))?;
    let report = ServiceAccountValidator::new().validate(&credentials);
    Ok((credentials, report))
}

fn execute_validate(file: &Path, session: &Session) -> Result<()> {
    let formatter = get_formatter(session.format, session.quiet);
    let (credentials, report) = validate_file(file)?;

    info!(path = %file.display(), valid = report.is_valid, "Validated credentials");

    if session.format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "valid": report.is_valid,
            "file": file.display().to_string(),
            "client_email": credentials.client_email,
            "errors": report.errors,
        }));
    } else if report.is_valid {
        formatter.success("Credentials are valid");
        formatter.info(&format!("Service account: {}", credentials.client_email));
        formatter.info(&format!("Project:         {}", credentials.project_id));
    } else {
        formatter.error(&format!("{} is not a valid service-account key", file.display()));
        for error in &report.errors {
            formatter.info(&format!("  - {error}"));
        }
    }

    if !report.is_valid {
        bail!("Credential validation failed");
    }
    Ok(())
}
